//! Candidate plate scoring and best-detection selection

use crate::domain::record::has_meaningful_data;
use crate::types::{CandidateDetection, DetectionResponse, DetectionStatus};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SHAPE_TOP: Regex = Regex::new(r"^[A-Z]{3}\d{4}$").unwrap();
    static ref SHAPE_AAA_DIGITS: Regex = Regex::new(r"^[A-Z]{3}\d{3,5}$").unwrap();
    static ref SHAPE_COMMON: Regex = Regex::new(r"^[A-Z]{2}\d{4,5}$|^\d{3,4}[A-Z]{3}$").unwrap();
}

/// Shape score used to rank OCR candidates; higher is more plate-like.
pub fn score_plate(plate: &str) -> u32 {
    let bare: String = plate.chars().filter(|c| *c != '-').collect();

    if SHAPE_TOP.is_match(&bare) {
        return 100;
    }
    if SHAPE_AAA_DIGITS.is_match(&bare) {
        return 90;
    }
    if SHAPE_COMMON.is_match(&bare) {
        return 80;
    }

    let len = bare.chars().count();
    if !(6..=9).contains(&len) {
        return 10;
    }
    50 + len.min(9) as u32
}

/// Uppercase, strip everything non-alphanumeric, and hyphenate the common
/// three-letter four-digit shape as `ABC-12-34`.
pub fn canonicalize(text: &str) -> String {
    let bare: String = text
        .to_uppercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if SHAPE_TOP.is_match(&bare) {
        format!("{}-{}-{}", &bare[..3], &bare[3..5], &bare[5..7])
    } else {
        bare
    }
}

/// Best detection among several: a candidate carrying a meaningful vehicle
/// record beats any without one, confidence breaks ties.
pub fn best_detection(candidates: &[CandidateDetection]) -> Option<&CandidateDetection> {
    candidates.iter().max_by(|a, b| {
        let backed_a = has_meaningful_data(a.datos_vehiculo.as_ref());
        let backed_b = has_meaningful_data(b.datos_vehiculo.as_ref());
        backed_a.cmp(&backed_b).then(
            a.confianza_deteccion
                .partial_cmp(&b.confianza_deteccion)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    })
}

/// Re-derive the primary plate from the candidate list when the service left
/// the top-level fields empty, mirroring the service's own best pick.
pub fn promote_best_candidate(response: &mut DetectionResponse) {
    if response.estado != DetectionStatus::Detected || !response.placa.trim().is_empty() {
        return;
    }
    let best = match best_detection(&response.todas_detecciones) {
        Some(best) => best.clone(),
        None => return,
    };
    response.placa = best.placa_final;
    response.confianza = best.confianza_deteccion;
    response.bbox = best.bbox;
    response.corregido = best.corregido_por_db;
    response.metodo = best.metodo_busqueda;
    response.placa_ocr = best.placa_ocr_original;
    if response.datos_vehiculo.is_none() {
        response.datos_vehiculo = best.datos_vehiculo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VehicleRecord;

    fn candidate(placa: &str, confianza: f64, record: Option<VehicleRecord>) -> CandidateDetection {
        CandidateDetection {
            placa_final: placa.to_string(),
            confianza_deteccion: confianza,
            datos_vehiculo: record,
            ..Default::default()
        }
    }

    fn record_with_brand(marca: &str) -> VehicleRecord {
        VehicleRecord {
            marca: Some(marca.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_score_ranks_common_shapes() {
        assert_eq!(score_plate("ABC1234"), 100);
        assert_eq!(score_plate("ABC-12-34"), 100);
        assert_eq!(score_plate("ABC12345"), 90);
        assert_eq!(score_plate("AB1234"), 80);
        assert_eq!(score_plate("1234ABC"), 80);
        // odd but mid-length shapes fall back to a length score
        assert_eq!(score_plate("A1B2C3"), 56);
        // too short or too long
        assert_eq!(score_plate("AB1"), 10);
        assert_eq!(score_plate("ABCDE123456"), 10);
    }

    #[test]
    fn test_canonicalize_hyphenates_top_shape() {
        assert_eq!(canonicalize("abc1234"), "ABC-12-34");
        assert_eq!(canonicalize("ABC 12 34"), "ABC-12-34");
        assert_eq!(canonicalize("AB1234"), "AB1234");
        assert_eq!(canonicalize("a!b@c#"), "ABC");
    }

    #[test]
    fn test_best_detection_prefers_record() {
        let candidates = vec![
            candidate("AAA111", 0.99, None),
            candidate("BBB222", 0.40, Some(record_with_brand("Nissan"))),
        ];
        let best = best_detection(&candidates).unwrap();
        assert_eq!(best.placa_final, "BBB222");
    }

    #[test]
    fn test_best_detection_confidence_breaks_ties() {
        let candidates = vec![
            candidate("AAA111", 0.40, None),
            candidate("BBB222", 0.80, None),
        ];
        let best = best_detection(&candidates).unwrap();
        assert_eq!(best.placa_final, "BBB222");
    }

    #[test]
    fn test_best_detection_empty() {
        assert!(best_detection(&[]).is_none());
    }

    #[test]
    fn test_promote_fills_empty_primary() {
        let mut response = DetectionResponse {
            estado: DetectionStatus::Detected,
            todas_detecciones: vec![
                candidate("AAA111", 0.30, None),
                candidate("XYZ123", 0.70, Some(record_with_brand("Toyota"))),
            ],
            ..Default::default()
        };
        promote_best_candidate(&mut response);
        assert_eq!(response.placa, "XYZ123");
        assert_eq!(response.confianza, 0.70);
        assert!(response.datos_vehiculo.is_some());
    }

    #[test]
    fn test_promote_keeps_existing_primary() {
        let mut response = DetectionResponse {
            estado: DetectionStatus::Detected,
            placa: "ABC1234".to_string(),
            todas_detecciones: vec![candidate("XYZ123", 0.70, None)],
            ..Default::default()
        };
        promote_best_candidate(&mut response);
        assert_eq!(response.placa, "ABC1234");
    }
}
