//! Wire types for the plate recognition service response contract

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize null as default value
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

/// Detection outcome sentinel carried in the service's `estado` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionStatus {
    /// "exito" - at least one plate was detected and read
    #[serde(rename = "exito")]
    Detected,
    /// "no_detectado" - no plate found in the image
    #[serde(rename = "no_detectado")]
    NotDetected,
    /// "error" - the service failed to process every detection
    #[serde(rename = "error")]
    Error,
    /// Any sentinel this client does not know
    #[default]
    #[serde(other)]
    Unknown,
}

/// Owner data joined into a vehicle record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub contacto: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
}

/// Vehicle record returned by the authoritative lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    #[serde(default)]
    pub matricula: Option<String>,
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
    #[serde(default)]
    pub propietario: Option<OwnerRecord>,
}

/// One of several detections found in a single image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateDetection {
    /// Plate text after any database correction
    #[serde(default, deserialize_with = "null_to_default")]
    pub placa_final: String,

    /// Raw OCR text before correction
    #[serde(default)]
    pub placa_ocr_original: Option<String>,

    /// Detector confidence (0.0 - 1.0)
    #[serde(default, deserialize_with = "null_to_default")]
    pub confianza_deteccion: f64,

    /// Bounding box [x1, y1, x2, y2]
    #[serde(default, deserialize_with = "null_to_default")]
    pub bbox: Vec<i64>,

    /// Rank among the detections of this image
    #[serde(default, deserialize_with = "null_to_default")]
    pub indice: usize,

    /// Whether the plate text was corrected via database similarity
    #[serde(default, deserialize_with = "null_to_default")]
    pub corregido_por_db: bool,

    /// Lookup method the service used ("exacta", "similitud", "ocr_directo")
    #[serde(default)]
    pub metodo_busqueda: Option<String>,

    #[serde(default)]
    pub datos_vehiculo: Option<VehicleRecord>,
}

/// Full response of one capture attempt, as produced by the upstream oracle.
///
/// Immutable after parsing; exactly one `decide` call consumes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub estado: DetectionStatus,

    /// Best plate text of the capture (may be empty)
    #[serde(default, deserialize_with = "null_to_default")]
    pub placa: String,

    /// Confidence of the best detection (0.0 - 1.0)
    #[serde(default, deserialize_with = "null_to_default")]
    pub confianza: f64,

    /// Bounding box of the best detection [x1, y1, x2, y2]
    #[serde(default, deserialize_with = "null_to_default")]
    pub bbox: Vec<i64>,

    /// Whether the best plate was corrected against the database
    #[serde(default, deserialize_with = "null_to_default")]
    pub corregido: bool,

    /// Lookup method used for the best plate
    #[serde(default)]
    pub metodo: Option<String>,

    /// Raw OCR text of the best plate before correction
    #[serde(default)]
    pub placa_ocr: Option<String>,

    #[serde(default)]
    pub datos_vehiculo: Option<VehicleRecord>,

    /// All detections of the image, ranked by the service
    #[serde(default, deserialize_with = "null_to_default")]
    pub todas_detecciones: Vec<CandidateDetection>,

    #[serde(default)]
    pub total_detecciones: Option<usize>,

    /// Human-readable message (transport errors, no-detection hints)
    #[serde(default)]
    pub mensaje: Option<String>,

    /// Retry suggestions sent along with a no-detection reply
    #[serde(default, deserialize_with = "null_to_default")]
    pub sugerencias: Vec<String>,
}

/// Verdict for one image of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEntry {
    pub image_path: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub verdict: crate::domain::Verdict,
}

/// Batch decision results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    pub entries: Vec<CaptureEntry>,
    /// Total images processed
    pub total_processed: usize,
    /// Number of accepted plates
    pub accepted: usize,
    /// Number of rejections of any kind
    pub rejected: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_sentinels() {
        let ok: DetectionStatus = serde_json::from_str("\"exito\"").unwrap();
        assert_eq!(ok, DetectionStatus::Detected);
        let none: DetectionStatus = serde_json::from_str("\"no_detectado\"").unwrap();
        assert_eq!(none, DetectionStatus::NotDetected);
        let err: DetectionStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(err, DetectionStatus::Error);
        let other: DetectionStatus = serde_json::from_str("\"algo_nuevo\"").unwrap();
        assert_eq!(other, DetectionStatus::Unknown);
    }

    #[test]
    fn test_nulls_map_to_defaults() {
        let json = r#"{
            "estado": "exito",
            "placa": null,
            "confianza": null,
            "bbox": null,
            "todas_detecciones": null,
            "datos_vehiculo": null
        }"#;
        let response: DetectionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.placa, "");
        assert_eq!(response.confianza, 0.0);
        assert!(response.bbox.is_empty());
        assert!(response.todas_detecciones.is_empty());
        assert!(response.datos_vehiculo.is_none());
    }

    #[test]
    fn test_vehicle_record_year_field_name() {
        let json = r#"{"matricula": "ABC-12-34", "año": 2019}"#;
        let record: VehicleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.anio, Some(2019));
        let out = serde_json::to_string(&record).unwrap();
        assert!(out.contains("año"));
    }
}
