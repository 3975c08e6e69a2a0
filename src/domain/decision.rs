//! Decision engine: combines syntax, garbage, and record signals into a verdict

use crate::domain::plate::{is_garbage, is_plausible};
use crate::domain::record::has_meaningful_data;
use crate::types::{DetectionResponse, DetectionStatus, VehicleRecord};
use serde::{Deserialize, Serialize};

/// Why a readable plate was rejected as unregistered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The plate matches no known grammar and no record backs it
    #[serde(rename = "invalid-format-no-record")]
    InvalidFormatNoRecord,
    /// The plate looks real but the lookup returned nothing
    #[serde(rename = "valid-format-not-registered")]
    ValidFormatNotRegistered,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidFormatNoRecord => "invalid-format-no-record",
            RejectReason::ValidFormatNotRegistered => "valid-format-not-registered",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final, render-ready classification of one detection attempt.
///
/// Exactly one verdict exists per [`DetectionResponse`]; it is never mutated,
/// only replaced by the next capture attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Plate identification backed by an authoritative record
    Accepted {
        plate: String,
        record: VehicleRecord,
    },
    /// Readable plate with no backing record
    RejectedUnregistered {
        plate: String,
        reason: RejectReason,
    },
    /// Near-certain OCR misread with nothing backing it
    RejectedGarbage { plate: String },
    /// The service found no plate in the image
    RejectedNoDetection { message: Option<String> },
    /// Transport or service-side processing failure
    RejectedTransport { detail: String },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// Classify one detection result.
///
/// Pure and total: no I/O, no shared state, no panics; empty plate text and
/// missing records are ordinary inputs. Priority order between the signals is
/// fixed and must not be reordered:
/// 1. garbage without a record wins, even over a plausible shape;
/// 2. a meaningful record wins over both heuristics;
/// 3. otherwise the syntax check picks the rejection reason.
pub fn decide(result: DetectionResponse) -> Verdict {
    match result.estado {
        DetectionStatus::NotDetected => {
            return Verdict::RejectedNoDetection {
                message: result.mensaje,
            }
        }
        DetectionStatus::Error | DetectionStatus::Unknown => {
            return Verdict::RejectedTransport {
                detail: result
                    .mensaje
                    .unwrap_or_else(|| "el servicio reporto un error de procesamiento".to_string()),
            }
        }
        DetectionStatus::Detected => {}
    }

    let plausible = is_plausible(&result.placa);
    let garbage = is_garbage(&result.placa);
    let has_record = has_meaningful_data(result.datos_vehiculo.as_ref());

    if garbage && !has_record {
        return Verdict::RejectedGarbage {
            plate: result.placa,
        };
    }

    match result.datos_vehiculo {
        Some(record) if has_record => Verdict::Accepted {
            plate: result.placa,
            record,
        },
        _ if !plausible => Verdict::RejectedUnregistered {
            plate: result.placa,
            reason: RejectReason::InvalidFormatNoRecord,
        },
        _ => Verdict::RejectedUnregistered {
            plate: result.placa,
            reason: RejectReason::ValidFormatNotRegistered,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerRecord;

    fn detected(placa: &str, record: Option<VehicleRecord>) -> DetectionResponse {
        DetectionResponse {
            estado: DetectionStatus::Detected,
            placa: placa.to_string(),
            confianza: 0.9,
            datos_vehiculo: record,
            ..Default::default()
        }
    }

    fn toyota_record() -> VehicleRecord {
        VehicleRecord {
            matricula: Some("XYZ123".to_string()),
            marca: Some("Toyota".to_string()),
            propietario: Some(OwnerRecord {
                id: "p1".to_string(),
                nombre: Some("Juan".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_detection_is_terminal() {
        let result = DetectionResponse {
            estado: DetectionStatus::NotDetected,
            mensaje: Some("No se detectaron placas vehiculares en la imagen".to_string()),
            ..Default::default()
        };
        match decide(result) {
            Verdict::RejectedNoDetection { message } => {
                assert!(message.unwrap().contains("No se detectaron"));
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_service_error_maps_to_transport() {
        let result = DetectionResponse {
            estado: DetectionStatus::Error,
            mensaje: Some("Error interno del servidor".to_string()),
            ..Default::default()
        };
        match decide(result) {
            Verdict::RejectedTransport { detail } => assert!(detail.contains("interno")),
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_record_backed_plate_is_accepted() {
        let verdict = decide(detected("XYZ123", Some(toyota_record())));
        match verdict {
            Verdict::Accepted { plate, record } => {
                assert_eq!(plate, "XYZ123");
                assert_eq!(record.marca.as_deref(), Some("Toyota"));
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_record_overrides_garbage() {
        // garbage shape, but the lookup found a real vehicle
        let verdict = decide(detected("AAAAAA", Some(toyota_record())));
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_garbage_overrides_plausibility_without_record() {
        // matches a grammar AND a garbage shape; no record to back it
        let verdict = decide(detected("ABC12", None));
        assert!(matches!(verdict, Verdict::RejectedGarbage { .. }));
    }

    #[test]
    fn test_empty_record_counts_as_absent() {
        let verdict = decide(detected("AAAAAA", Some(VehicleRecord::default())));
        assert!(matches!(verdict, Verdict::RejectedGarbage { .. }));
    }

    #[test]
    fn test_plausible_without_record_is_unregistered() {
        let verdict = decide(detected("ABC1234", None));
        match verdict {
            Verdict::RejectedUnregistered { plate, reason } => {
                assert_eq!(plate, "ABC1234");
                assert_eq!(reason, RejectReason::ValidFormatNotRegistered);
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_implausible_without_record_is_unregistered() {
        let verdict = decide(detected("Z9", None));
        match verdict {
            Verdict::RejectedUnregistered { reason, .. } => {
                assert_eq!(reason, RejectReason::InvalidFormatNoRecord);
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_empty_plate_is_ordinary_input() {
        let verdict = decide(detected("", None));
        match verdict {
            Verdict::RejectedUnregistered { reason, .. } => {
                assert_eq!(reason, RejectReason::InvalidFormatNoRecord);
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(
            RejectReason::InvalidFormatNoRecord.to_string(),
            "invalid-format-no-record"
        );
        assert_eq!(
            serde_json::to_string(&RejectReason::ValidFormatNotRegistered).unwrap(),
            "\"valid-format-not-registered\""
        );
    }
}
