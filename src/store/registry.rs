//! Local vehicle/owner registry with OCR-tolerant lookup
//!
//! A JSON-file stand-in for the recognition service's vehicle database:
//! vehicles keyed by matricula, owners keyed by id. Lookup runs in three
//! stages - exact key, prefix variants of the first three characters, then a
//! global similarity scan - so that a plate misread by the OCR can still
//! resolve to its registered vehicle.

use crate::domain::similarity::{prefix_variants, similarity};
use crate::error::Result;
use crate::types::{OwnerRecord, VehicleRecord};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Minimum similarity for a prefix-variant candidate
const PREFIX_SIMILARITY_MIN: f64 = 0.75;
/// Minimum similarity for a global-scan candidate
const GLOBAL_SIMILARITY_MIN: f64 = 0.85;
/// Variants tried per lookup
const MAX_PREFIX_VARIANTS: usize = 8;
/// Candidates examined per prefix variant
const PREFIX_SCAN_LIMIT: usize = 10;

/// Vehicle data stored under its matricula key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredVehicle {
    #[serde(default)]
    pub marca: Option<String>,
    #[serde(default)]
    pub modelo: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, rename = "año")]
    pub anio: Option<i32>,
    #[serde(default)]
    pub propietario_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOwner {
    pub id: String,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub contacto: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryData {
    #[serde(default)]
    vehicles: BTreeMap<String, StoredVehicle>,
    #[serde(default)]
    owners: BTreeMap<String, StoredOwner>,
}

/// How a lookup hit was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMethod {
    Exact,
    PrefixVariant,
    GlobalSimilarity,
}

/// A registry hit, with the correction metadata the caller may surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryMatch {
    pub record: VehicleRecord,
    /// The plate as queried, when it differs from the registered matricula
    pub corrected_from: Option<String>,
    pub similarity: f64,
    pub method: LookupMethod,
}

/// Persistent registry of known vehicles and owners
pub struct VehicleRegistry {
    store_path: PathBuf,
    data: RegistryData,
}

impl VehicleRegistry {
    /// Create or load a registry at the given file path
    pub fn open(store_path: PathBuf) -> Result<Self> {
        if let Some(parent) = store_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if store_path.exists() {
            let file = File::open(&store_path)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).unwrap_or_default()
        } else {
            RegistryData::default()
        };

        Ok(Self { store_path, data })
    }

    fn save(&self) -> Result<()> {
        let file = File::create(&self.store_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.data)?;
        Ok(())
    }

    /// Register a vehicle under its matricula (normalized to uppercase)
    pub fn add_vehicle(&mut self, matricula: &str, vehicle: StoredVehicle) -> Result<()> {
        let key = matricula.trim().to_uppercase();
        self.data.vehicles.insert(key, vehicle);
        self.save()
    }

    pub fn add_owner(&mut self, owner: StoredOwner) -> Result<()> {
        self.data.owners.insert(owner.id.clone(), owner);
        self.save()
    }

    pub fn vehicle_count(&self) -> usize {
        self.data.vehicles.len()
    }

    pub fn owner_count(&self) -> usize {
        self.data.owners.len()
    }

    /// All registered plates with their vehicle data, ordered by matricula
    pub fn all_vehicles(&self) -> impl Iterator<Item = (&String, &StoredVehicle)> {
        self.data.vehicles.iter()
    }

    /// Join vehicle and owner data into one record, like the service does
    fn assemble(&self, matricula: &str, vehicle: &StoredVehicle) -> VehicleRecord {
        let propietario = vehicle
            .propietario_id
            .as_deref()
            .and_then(|id| self.data.owners.get(id))
            .map(|owner| OwnerRecord {
                id: owner.id.clone(),
                nombre: owner.nombre.clone(),
                contacto: owner.contacto.clone(),
                telefono: owner.telefono.clone(),
            });

        VehicleRecord {
            matricula: Some(matricula.to_string()),
            marca: vehicle.marca.clone(),
            modelo: vehicle.modelo.clone(),
            color: vehicle.color.clone(),
            anio: vehicle.anio,
            propietario_id: vehicle.propietario_id.clone(),
            propietario,
        }
    }

    /// Find a vehicle for a detected plate.
    ///
    /// Exact match first; then prefix variants of the first three characters
    /// with similarity >= 0.75; then a global scan with similarity >= 0.85.
    /// The best candidate by similarity wins within each stage.
    pub fn lookup(&self, plate: &str) -> Option<RegistryMatch> {
        let wanted = plate.trim().to_uppercase();
        if wanted.is_empty() {
            return None;
        }

        if let Some(vehicle) = self.data.vehicles.get(&wanted) {
            return Some(RegistryMatch {
                record: self.assemble(&wanted, vehicle),
                corrected_from: None,
                similarity: 1.0,
                method: LookupMethod::Exact,
            });
        }

        if wanted.chars().count() >= 3 {
            let prefix: String = wanted.chars().take(3).collect();
            let mut candidates: Vec<(f64, &String, &StoredVehicle)> = Vec::new();

            for variant in prefix_variants(&prefix, MAX_PREFIX_VARIANTS) {
                let scan = self
                    .data
                    .vehicles
                    .range(variant.clone()..)
                    .take_while(|(matricula, _)| matricula.starts_with(&variant))
                    .take(PREFIX_SCAN_LIMIT);
                for (matricula, vehicle) in scan {
                    let sim = similarity(&wanted, matricula);
                    if sim >= PREFIX_SIMILARITY_MIN {
                        candidates.push((sim, matricula, vehicle));
                    }
                }
            }

            if let Some((sim, matricula, vehicle)) = candidates
                .into_iter()
                .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            {
                debug!(
                    "registry prefix-variant hit: {} -> {} (sim {:.2})",
                    wanted, matricula, sim
                );
                return Some(RegistryMatch {
                    record: self.assemble(matricula, vehicle),
                    corrected_from: Some(wanted),
                    similarity: sim,
                    method: LookupMethod::PrefixVariant,
                });
            }
        }

        let best_global = self
            .data
            .vehicles
            .iter()
            .map(|(matricula, vehicle)| (similarity(&wanted, matricula), matricula, vehicle))
            .filter(|(sim, _, _)| *sim >= GLOBAL_SIMILARITY_MIN)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        best_global.map(|(sim, matricula, vehicle)| {
            debug!(
                "registry global-similarity hit: {} -> {} (sim {:.2})",
                wanted, matricula, sim
            );
            RegistryMatch {
                record: self.assemble(matricula, vehicle),
                corrected_from: Some(wanted),
                similarity: sim,
                method: LookupMethod::GlobalSimilarity,
            }
        })
    }

    /// Import vehicles from a CSV with header
    /// `matricula,marca,modelo,color,año,propietario_id`. Returns rows added.
    pub fn import_vehicles_csv(&mut self, path: &Path) -> Result<usize> {
        #[derive(Deserialize)]
        struct VehicleRow {
            matricula: String,
            #[serde(default)]
            marca: Option<String>,
            #[serde(default)]
            modelo: Option<String>,
            #[serde(default)]
            color: Option<String>,
            #[serde(default, rename = "año", alias = "anio")]
            anio: Option<i32>,
            #[serde(default)]
            propietario_id: Option<String>,
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut imported = 0;
        for row in reader.deserialize() {
            let row: VehicleRow = row?;
            let key = row.matricula.trim().to_uppercase();
            if key.is_empty() {
                continue;
            }
            self.data.vehicles.insert(
                key,
                StoredVehicle {
                    marca: non_empty(row.marca),
                    modelo: non_empty(row.modelo),
                    color: non_empty(row.color),
                    anio: row.anio,
                    propietario_id: non_empty(row.propietario_id),
                },
            );
            imported += 1;
        }
        self.save()?;
        Ok(imported)
    }

    /// Import owners from a CSV with header `id,nombre,contacto,telefono`.
    pub fn import_owners_csv(&mut self, path: &Path) -> Result<usize> {
        #[derive(Deserialize)]
        struct OwnerRow {
            id: String,
            #[serde(default)]
            nombre: Option<String>,
            #[serde(default)]
            contacto: Option<String>,
            #[serde(default)]
            telefono: Option<String>,
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut imported = 0;
        for row in reader.deserialize() {
            let row: OwnerRow = row?;
            if row.id.is_empty() {
                continue;
            }
            self.data.owners.insert(
                row.id.clone(),
                StoredOwner {
                    id: row.id,
                    nombre: non_empty(row.nombre),
                    contacto: non_empty(row.contacto),
                    telefono: non_empty(row.telefono),
                },
            );
            imported += 1;
        }
        self.save()?;
        Ok(imported)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registry_with(entries: &[(&str, &str)]) -> (tempfile::TempDir, VehicleRegistry) {
        let dir = tempdir().unwrap();
        let mut registry = VehicleRegistry::open(dir.path().join("registry.json")).unwrap();
        for (matricula, marca) in entries {
            registry
                .add_vehicle(
                    matricula,
                    StoredVehicle {
                        marca: Some(marca.to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
        }
        (dir, registry)
    }

    #[test]
    fn test_exact_lookup() {
        let (_dir, registry) = registry_with(&[("ABC-12-34", "Toyota")]);
        let hit = registry.lookup("abc-12-34").unwrap();
        assert_eq!(hit.method, LookupMethod::Exact);
        assert_eq!(hit.similarity, 1.0);
        assert!(hit.corrected_from.is_none());
        assert_eq!(hit.record.matricula.as_deref(), Some("ABC-12-34"));
        assert_eq!(hit.record.marca.as_deref(), Some("Toyota"));
    }

    #[test]
    fn test_prefix_variant_corrects_ocr_confusion() {
        // registered with B, misread as 8
        let (_dir, registry) = registry_with(&[("ABC-12-34", "Toyota")]);
        let hit = registry.lookup("A8C-12-34").unwrap();
        assert_eq!(hit.method, LookupMethod::PrefixVariant);
        assert!(hit.similarity >= 0.75);
        assert_eq!(hit.corrected_from.as_deref(), Some("A8C-12-34"));
        assert_eq!(hit.record.matricula.as_deref(), Some("ABC-12-34"));
    }

    #[test]
    fn test_global_similarity_fallback() {
        // third char misread beyond the confusion table: only the global scan sees it
        let (_dir, registry) = registry_with(&[("KLM1234", "Nissan")]);
        let hit = registry.lookup("KLX1234").unwrap();
        assert_eq!(hit.method, LookupMethod::GlobalSimilarity);
        assert!(hit.similarity >= 0.85);
        assert_eq!(hit.record.matricula.as_deref(), Some("KLM1234"));
    }

    #[test]
    fn test_miss_returns_none() {
        let (_dir, registry) = registry_with(&[("ABC-12-34", "Toyota")]);
        assert!(registry.lookup("QQQ9999").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_owner_joined_into_record() {
        let dir = tempdir().unwrap();
        let mut registry = VehicleRegistry::open(dir.path().join("registry.json")).unwrap();
        registry
            .add_owner(StoredOwner {
                id: "p1".to_string(),
                nombre: Some("Juan".to_string()),
                contacto: None,
                telefono: Some("555-0001".to_string()),
            })
            .unwrap();
        registry
            .add_vehicle(
                "XYZ123",
                StoredVehicle {
                    marca: Some("Toyota".to_string()),
                    propietario_id: Some("p1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let hit = registry.lookup("XYZ123").unwrap();
        let owner = hit.record.propietario.unwrap();
        assert_eq!(owner.nombre.as_deref(), Some("Juan"));
        assert_eq!(hit.record.propietario_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_reload_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.json");
        {
            let mut registry = VehicleRegistry::open(path.clone()).unwrap();
            registry
                .add_vehicle("ABC1234", StoredVehicle::default())
                .unwrap();
        }
        let registry = VehicleRegistry::open(path).unwrap();
        assert_eq!(registry.vehicle_count(), 1);
        assert!(registry.lookup("ABC1234").is_some());
    }

    #[test]
    fn test_csv_import() {
        let dir = tempdir().unwrap();
        let vehicles_csv = dir.path().join("vehicles.csv");
        std::fs::write(
            &vehicles_csv,
            "matricula,marca,modelo,color,año,propietario_id\n\
             ABC-12-34,Toyota,Corolla,Rojo,2019,p1\n\
             xyz123,Nissan,,,,\n",
        )
        .unwrap();
        let owners_csv = dir.path().join("owners.csv");
        std::fs::write(
            &owners_csv,
            "id,nombre,contacto,telefono\np1,Juan,juan@example.com,555-0001\n",
        )
        .unwrap();

        let mut registry = VehicleRegistry::open(dir.path().join("registry.json")).unwrap();
        assert_eq!(registry.import_vehicles_csv(&vehicles_csv).unwrap(), 2);
        assert_eq!(registry.import_owners_csv(&owners_csv).unwrap(), 1);

        let hit = registry.lookup("XYZ123").unwrap();
        assert_eq!(hit.record.marca.as_deref(), Some("Nissan"));
        assert!(hit.record.modelo.is_none());

        let hit = registry.lookup("ABC-12-34").unwrap();
        assert_eq!(hit.record.anio, Some(2019));
        assert_eq!(
            hit.record.propietario.unwrap().nombre.as_deref(),
            Some("Juan")
        );
    }
}
