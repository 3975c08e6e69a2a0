//! Presence check for authoritative vehicle records

use crate::types::VehicleRecord;

/// Whether the record carries meaningful data: at least one field that is
/// neither absent nor an empty string. A missing record is never meaningful.
///
/// Read-only predicate; the record stays owned by the caller.
pub fn has_meaningful_data(record: Option<&VehicleRecord>) -> bool {
    let record = match record {
        Some(r) => r,
        None => return false,
    };

    let filled = |field: &Option<String>| field.as_deref().map_or(false, |v| !v.is_empty());

    filled(&record.matricula)
        || filled(&record.marca)
        || filled(&record.modelo)
        || filled(&record.color)
        || filled(&record.propietario_id)
        || record.anio.is_some()
        || record.propietario.as_ref().map_or(false, |owner| {
            !owner.id.is_empty()
                || filled(&owner.nombre)
                || filled(&owner.contacto)
                || filled(&owner.telefono)
        })
}
