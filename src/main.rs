use log::{info, warn};

use camera_roll_loc::camera_roll::{photo_source_for, MediaType};
use camera_roll_loc::file_store::file_store_for;
use camera_roll_loc::{CameraRollWithLoc, Config, FilterSpec, ImageResolver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let config = Config::from_env()?;
    info!("Library path: {}", config.library_path.display());
    info!("Cache path: {}", config.cache_path.display());

    let source = photo_source_for(&config);
    let roll = CameraRollWithLoc::new(source);

    let all = roll.query_photos(None, false).await?;
    info!("Loaded {} photos", all.len());

    roll.filter_photos(
        FilterSpec {
            media_types: Some(vec![MediaType::Image]),
            ..Default::default()
        },
        true,
    )?
    .sort_photos(&[])?;
    let mut page = roll.get_photos(config.page_size)?;

    let resolver = ImageResolver::with_store(file_store_for(&config), config.file_cache);

    let pending: Vec<_> = page
        .iter_mut()
        .map(|photo| resolver.resolve(photo, None, None))
        .collect();
    for (photo, handle) in page.iter().zip(pending) {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("No local image for {}: {}", photo.uuid, e),
            Err(e) => warn!("Image resolution task for {} failed: {}", photo.uuid, e),
        }
    }

    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
