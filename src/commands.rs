//! Command handlers

use crate::cli::{Cli, Commands, OutputFormat};
use crate::config::Config;
use crate::domain::candidates::promote_best_candidate;
use crate::domain::record::has_meaningful_data;
use crate::domain::{decide, Verdict};
use crate::error::{CacheError, Error, Result};
use crate::output::{render_lookup, render_verdict};
use crate::recognition::cache::ResponseCache;
use crate::recognition::RecognitionClient;
use crate::scanner::{scan_directory, validate_image};
use crate::store::{LookupMethod, VehicleRegistry};
use crate::types::{CaptureEntry, CaptureReport, DetectionResponse, DetectionStatus};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    // Load config
    let mut config = Config::load()?;

    // Override from CLI args
    if let Some(ref api_url) = cli.api_url {
        config.api_url = api_url.clone();
    }

    match &cli.command {
        Commands::Detect {
            image,
            no_cache,
            no_registry,
        } => {
            // Cache disabled if: --no-cache OR config.cache_enabled=false
            let use_cache = !no_cache && config.cache_enabled;
            let output_format = cli.format.unwrap_or(config.output_format);
            cmd_detect(&config, image.clone(), use_cache, *no_registry, output_format)
        }

        Commands::Batch {
            folder,
            output,
            no_cache,
            jobs,
        } => {
            // Use CLI jobs if specified, otherwise default 4. 0 = auto CPU count.
            let job_count = match jobs {
                Some(0) => num_cpus::get(),
                Some(n) => *n,
                None => 4,
            };
            let use_cache = !no_cache && config.cache_enabled;
            let output_format = cli.format.unwrap_or(config.output_format);
            cmd_batch(
                &config,
                folder.clone(),
                output.clone(),
                use_cache,
                job_count,
                output_format,
            )
        }

        Commands::Lookup { plate } => {
            let output_format = cli.format.unwrap_or(config.output_format);
            cmd_lookup(&config, plate, output_format)
        }

        Commands::Registry {
            list,
            import_vehicles,
            import_owners,
        } => cmd_registry(&config, *list, import_vehicles.clone(), import_owners.clone()),

        Commands::Config {
            show,
            set_api_url,
            set_timeout,
            set_cache,
            set_output,
            set_registry,
            reset,
        } => cmd_config(
            *show,
            set_api_url.clone(),
            *set_timeout,
            *set_cache,
            *set_output,
            set_registry.clone(),
            *reset,
        ),

        Commands::Cache { clear, stats } => cmd_cache(&config, *clear, *stats),
    }
}

/// Run one full capture decision: cached-or-fresh detection, candidate
/// promotion, optional registry enrichment, then the decision engine.
/// Transport failures become a transport verdict; this never errors.
fn decide_capture(
    client: &RecognitionClient,
    cache: Option<&ResponseCache>,
    registry: Option<&VehicleRegistry>,
    image: &Path,
) -> Verdict {
    let mut response = match fetch_detection(client, cache, image) {
        Ok(response) => response,
        Err(err) => {
            warn!("transport failure for {}: {}", image.display(), err);
            return Verdict::RejectedTransport {
                detail: err.to_string(),
            };
        }
    };

    debug!(
        "{}: estado={:?} placa='{}' conf={:.2} candidatos={}",
        image.display(),
        response.estado,
        response.placa,
        response.confianza,
        response.todas_detecciones.len()
    );

    promote_best_candidate(&mut response);
    if let Some(registry) = registry {
        enrich_from_registry(registry, &mut response);
    }

    decide(response)
}

fn fetch_detection(
    client: &RecognitionClient,
    cache: Option<&ResponseCache>,
    image: &Path,
) -> Result<DetectionResponse> {
    if let Some(cache) = cache {
        if let Ok(Some(cached)) = cache.get(image) {
            debug!("using cached response for {}", image.display());
            return Ok(cached);
        }
    }

    let response = client.detect(image)?;

    if let Some(cache) = cache {
        let _ = cache.set(image, &response);
    }

    Ok(response)
}

/// Attach a record from the local registry when the service found none,
/// correcting the plate text the way the service's own database lookup would.
fn enrich_from_registry(registry: &VehicleRegistry, response: &mut DetectionResponse) {
    if response.estado != DetectionStatus::Detected {
        return;
    }
    if has_meaningful_data(response.datos_vehiculo.as_ref()) {
        return;
    }

    let hit = match registry.lookup(&response.placa) {
        Some(hit) => hit,
        None => return,
    };

    info!(
        "local registry hit for '{}' via {:?} (similarity {:.2})",
        response.placa, hit.method, hit.similarity
    );

    if let Some(matricula) = hit.record.matricula.clone() {
        if matricula != response.placa {
            response.placa_ocr = Some(std::mem::replace(&mut response.placa, matricula));
            response.corregido = true;
            response.metodo = Some(
                match hit.method {
                    LookupMethod::Exact => "exacta",
                    LookupMethod::PrefixVariant | LookupMethod::GlobalSimilarity => "similitud",
                }
                .to_string(),
            );
        }
    }
    response.datos_vehiculo = Some(hit.record);
}

fn open_registry(config: &Config, skip: bool) -> Option<VehicleRegistry> {
    if skip {
        return None;
    }
    let path = match config.registry_file() {
        Ok(path) => path,
        Err(_) => return None,
    };
    if !path.exists() {
        return None;
    }
    match VehicleRegistry::open(path) {
        Ok(registry) => Some(registry),
        Err(err) => {
            warn!("failed to open local registry: {}", err);
            None
        }
    }
}

fn cmd_detect(
    config: &Config,
    image: PathBuf,
    use_cache: bool,
    no_registry: bool,
    output_format: OutputFormat,
) -> Result<()> {
    // Validate image
    validate_image(&image)?;

    let cache = if use_cache {
        Some(ResponseCache::new(config.cache_dir()?)?)
    } else {
        None
    };
    let client = RecognitionClient::new(config)?;
    let registry = open_registry(config, no_registry);

    let verdict = decide_capture(&client, cache.as_ref(), registry.as_ref(), &image);
    render_verdict(output_format, &verdict)?;

    Ok(())
}

/// Verdict for one image produced by a batch worker
#[derive(Debug)]
struct DetectTaskResult {
    image_path: PathBuf,
    verdict: Verdict,
}

fn cmd_batch(
    config: &Config,
    folder: PathBuf,
    output: Option<PathBuf>,
    use_cache: bool,
    jobs: usize,
    output_format: OutputFormat,
) -> Result<()> {
    // Scan directory
    let images = scan_directory(&folder)?;

    if images.is_empty() {
        return Err(Error::FileNotFound(format!(
            "No images found in {}",
            folder.display()
        )));
    }

    let total_images = images.len();
    info!(
        "deciding {} images with {} parallel jobs (cache: {})",
        total_images,
        jobs,
        if use_cache { "on" } else { "off" }
    );

    let cache_dir = if use_cache {
        Some(config.cache_dir()?)
    } else {
        None
    };
    let client = RecognitionClient::new(config)?;

    // Setup progress bar
    let progress = ProgressBar::new(total_images as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    // Shared results collector
    let results: Arc<Mutex<Vec<DetectTaskResult>>> = Arc::new(Mutex::new(Vec::new()));
    let images = Arc::new(images);
    let next_index = Arc::new(AtomicUsize::new(0));

    let started_at = Utc::now();

    // Spawn worker threads
    let mut handles = Vec::new();

    for _ in 0..jobs {
        let images = Arc::clone(&images);
        let next_index = Arc::clone(&next_index);
        let results = Arc::clone(&results);
        let cache_dir = cache_dir.clone();
        let client = client.clone();
        let registry_config = config.clone();
        let pb = progress.clone();

        let handle = thread::spawn(move || {
            let cache = cache_dir.and_then(|dir| ResponseCache::new(dir).ok());
            let registry = open_registry(&registry_config, false);

            loop {
                // Get next image to process (lock-free)
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                if idx >= images.len() {
                    break;
                }

                let image = &images[idx];

                let filename = image
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_string();
                pb.set_message(filename);

                let verdict = decide_capture(&client, cache.as_ref(), registry.as_ref(), image);

                {
                    let mut results_guard = results.lock().unwrap();
                    results_guard.push(DetectTaskResult {
                        image_path: image.clone(),
                        verdict,
                    });
                }

                pb.inc(1);
            }
        });

        handles.push(handle);
    }

    // Wait for all workers to complete
    for handle in handles {
        let _ = handle.join();
    }

    progress.finish_with_message("Complete");

    let completed_at = Utc::now();

    // Collect results
    let task_results = Arc::try_unwrap(results)
        .expect("All workers should be done")
        .into_inner()
        .unwrap();

    let mut entries: Vec<CaptureEntry> = task_results
        .into_iter()
        .map(|task| CaptureEntry {
            image_path: task.image_path.display().to_string(),
            timestamp: Utc::now(),
            verdict: task.verdict,
        })
        .collect();

    // Sort entries by image path for consistent output
    entries.sort_by(|a, b| a.image_path.cmp(&b.image_path));

    let accepted = entries.iter().filter(|e| e.verdict.is_accepted()).count();
    let report = CaptureReport {
        total_processed: total_images,
        accepted,
        rejected: total_images - accepted,
        entries,
        started_at,
        completed_at,
    };

    // Output results
    if let Some(output_path) = output {
        let content = serde_json::to_string_pretty(&report)?;
        std::fs::write(&output_path, content)?;
        println!("Results saved to: {}", output_path.display());
    } else {
        // Print summary
        println!("\nBatch Decision Complete");
        println!("=======================");
        println!("Total:      {}", report.total_processed);
        println!("Accepted:   {}", report.accepted);
        println!("Rejected:   {}", report.rejected);
        println!(
            "Duration:   {:.1}s",
            (report.completed_at - report.started_at).num_milliseconds() as f64 / 1000.0
        );

        if output_format == OutputFormat::Json {
            let content = serde_json::to_string_pretty(&report)?;
            println!("\n{}", content);
        }
    }

    Ok(())
}

fn cmd_lookup(config: &Config, plate: &str, output_format: OutputFormat) -> Result<()> {
    let path = config.registry_file()?;
    if !path.exists() {
        return Err(Error::Registry(format!(
            "No local registry at {}. Import vehicles with: placa-checker registry --import-vehicles <csv>",
            path.display()
        )));
    }

    let registry = VehicleRegistry::open(path)?;
    match registry.lookup(plate) {
        Some(hit) => render_lookup(output_format, &hit)?,
        None => {
            if output_format == OutputFormat::Json {
                println!("null");
            } else {
                println!("La matricula no se encontro en el registro local.");
            }
        }
    }

    Ok(())
}

fn cmd_registry(
    config: &Config,
    list: bool,
    import_vehicles: Option<PathBuf>,
    import_owners: Option<PathBuf>,
) -> Result<()> {
    let mut registry = VehicleRegistry::open(config.registry_file()?)?;
    let mut modified = false;

    if let Some(path) = import_vehicles {
        let count = registry.import_vehicles_csv(&path)?;
        println!("Imported {} vehicles from {}", count, path.display());
        modified = true;
    }

    if let Some(path) = import_owners {
        let count = registry.import_owners_csv(&path)?;
        println!("Imported {} owners from {}", count, path.display());
        modified = true;
    }

    if list || !modified {
        println!(
            "Registered vehicles: {} (owners: {})",
            registry.vehicle_count(),
            registry.owner_count()
        );
        for (matricula, vehicle) in registry.all_vehicles() {
            println!(
                "  {:<12} {} {}",
                matricula,
                vehicle.marca.as_deref().unwrap_or("-"),
                vehicle.modelo.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}

fn cmd_config(
    show: bool,
    set_api_url: Option<String>,
    set_timeout: Option<u64>,
    set_cache: Option<bool>,
    set_output: Option<OutputFormat>,
    set_registry: Option<PathBuf>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    if let Some(api_url) = set_api_url {
        config.api_url = api_url;
        modified = true;
    }

    if let Some(timeout_secs) = set_timeout {
        config.timeout_secs = timeout_secs;
        modified = true;
    }

    if let Some(cache_enabled) = set_cache {
        config.cache_enabled = cache_enabled;
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    if let Some(registry_path) = set_registry {
        config.registry_path = Some(registry_path);
        modified = true;
    }

    if modified {
        config.save()?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("{}", config);
    }

    Ok(())
}

fn cmd_cache(config: &Config, clear: bool, stats: bool) -> Result<()> {
    if !config.cache_enabled {
        return Err(Error::Cache(CacheError::Disabled));
    }

    let cache = ResponseCache::new(config.cache_dir()?)?;

    if clear {
        let count = cache.clear()?;
        println!("Cleared {} cached entries", count);
    }

    if stats || !clear {
        let stats = cache.stats()?;
        println!("{}", stats);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredVehicle;
    use crate::types::VehicleRecord;
    use tempfile::tempdir;

    fn registry_with_vehicle(dir: &Path) -> VehicleRegistry {
        let mut registry = VehicleRegistry::open(dir.join("registry.json")).unwrap();
        registry
            .add_vehicle(
                "ABC-12-34",
                StoredVehicle {
                    marca: Some("Toyota".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_enrich_attaches_record_and_corrects_plate() {
        let dir = tempdir().unwrap();
        let registry = registry_with_vehicle(dir.path());

        let mut response = DetectionResponse {
            estado: DetectionStatus::Detected,
            placa: "A8C-12-34".to_string(),
            ..Default::default()
        };
        enrich_from_registry(&registry, &mut response);

        assert_eq!(response.placa, "ABC-12-34");
        assert!(response.corregido);
        assert_eq!(response.placa_ocr.as_deref(), Some("A8C-12-34"));
        assert_eq!(response.metodo.as_deref(), Some("similitud"));
        assert!(has_meaningful_data(response.datos_vehiculo.as_ref()));
    }

    #[test]
    fn test_enrich_leaves_service_record_alone() {
        let dir = tempdir().unwrap();
        let registry = registry_with_vehicle(dir.path());

        let service_record = VehicleRecord {
            marca: Some("Nissan".to_string()),
            ..Default::default()
        };
        let mut response = DetectionResponse {
            estado: DetectionStatus::Detected,
            placa: "ABC-12-34".to_string(),
            datos_vehiculo: Some(service_record),
            ..Default::default()
        };
        enrich_from_registry(&registry, &mut response);

        assert_eq!(
            response.datos_vehiculo.unwrap().marca.as_deref(),
            Some("Nissan")
        );
        assert!(!response.corregido);
    }

    #[test]
    fn test_enrich_skips_non_detections() {
        let dir = tempdir().unwrap();
        let registry = registry_with_vehicle(dir.path());

        let mut response = DetectionResponse {
            estado: DetectionStatus::NotDetected,
            placa: "ABC-12-34".to_string(),
            ..Default::default()
        };
        enrich_from_registry(&registry, &mut response);
        assert!(response.datos_vehiculo.is_none());
    }
}
