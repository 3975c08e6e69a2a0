//! Output formatting module

use crate::cli::OutputFormat;
use crate::domain::{RejectReason, Verdict};
use crate::error::Result;
use crate::store::{LookupMethod, RegistryMatch};
use crate::types::VehicleRecord;

/// Retry hints shown when no plate was found, matching the capture app
const RETRY_SUGGESTIONS: &[&str] = &[
    "Asegurate de que la placa este bien visible",
    "Mejora la iluminacion",
    "Acerca mas la camara",
    "Evita reflejos o sombras",
];

pub fn render_verdict(output_format: OutputFormat, verdict: &Verdict) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = serde_json::to_string_pretty(verdict)?;
        println!("{}", content);
        return Ok(());
    }

    match verdict {
        Verdict::Accepted { plate, record } => {
            println!("\nPlaca aceptada");
            println!("==============");
            println!("Placa:        {}", plate);
            print_record(record);
        }
        Verdict::RejectedUnregistered { plate, reason } => match reason {
            RejectReason::ValidFormatNotRegistered => {
                println!("\nNo registrada");
                println!("=============");
                println!(
                    "La placa {} tiene formato valido pero no esta registrada en la base de datos.",
                    plate
                );
            }
            RejectReason::InvalidFormatNoRecord => {
                println!("\nNo encontrado");
                println!("=============");
                println!("La matricula no se encontro en la base de datos.");
            }
        },
        Verdict::RejectedGarbage { .. } => {
            println!("\nNo encontrado");
            println!("=============");
            println!("La matricula no se encontro en la base de datos.");
            println!("Por favor, intente de nuevo.");
        }
        Verdict::RejectedNoDetection { message } => {
            println!("\nSin deteccion");
            println!("=============");
            println!(
                "{}",
                message
                    .as_deref()
                    .unwrap_or("No se detecto ninguna placa en la imagen.")
            );
            println!("\nSugerencias:");
            for suggestion in RETRY_SUGGESTIONS {
                println!("  - {}", suggestion);
            }
        }
        Verdict::RejectedTransport { detail } => {
            println!("\nError de conexion");
            println!("=================");
            println!("No se pudo completar la consulta: {}", detail);
        }
    }

    Ok(())
}

pub fn render_lookup(output_format: OutputFormat, hit: &RegistryMatch) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = serde_json::to_string_pretty(hit)?;
        println!("{}", content);
        return Ok(());
    }

    println!("\nRegistro encontrado");
    println!("===================");
    let method = match hit.method {
        LookupMethod::Exact => "exacta",
        LookupMethod::PrefixVariant => "variante de prefijo",
        LookupMethod::GlobalSimilarity => "similitud global",
    };
    println!("Busqueda:     {} (similitud {:.0}%)", method, hit.similarity * 100.0);
    if let Some(ref original) = hit.corrected_from {
        println!("Corregida de: {}", original);
    }
    print_record(&hit.record);

    Ok(())
}

fn print_record(record: &VehicleRecord) {
    let text = |field: &Option<String>| field.clone().unwrap_or_else(|| "N/A".to_string());

    if let Some(ref matricula) = record.matricula {
        println!("Matricula:    {}", matricula);
    }
    println!(
        "Propietario:  {}",
        record
            .propietario
            .as_ref()
            .and_then(|owner| owner.nombre.clone())
            .unwrap_or_else(|| "N/A".to_string())
    );
    println!("Marca:        {}", text(&record.marca));
    println!("Modelo:       {}", text(&record.modelo));
    println!("Color:        {}", text(&record.color));
    println!(
        "Año:          {}",
        record
            .anio
            .map(|y| y.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    );
}
