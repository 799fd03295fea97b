use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Result;
use image::DynamicImage;
use image::imageops::FilterType;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapters::Fit;
use crate::events::{LoadPhoto, LoaderOutput, PhotoFailed, PhotoLoaded, PreparedImageCpu, Slot};
use crate::processing::layout::resize_to_contain;

// Decodes an image, applies EXIF orientation if available and sizes it for
// its target box. Orientation is best-effort; missing metadata keeps the
// stored orientation.
pub fn decode_for_fit(path: &Path, fit: Fit) -> Result<image::RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;

    let img = apply_orientation(img, read_orientation(path).unwrap_or(1));

    let img = match fit {
        Fit::CenterCrop { width, height } => {
            img.resize_to_fill(width.max(1), height.max(1), FilterType::Triangle)
        }
        Fit::Contain { width, height } => {
            let (w, h) = resize_to_contain(width, height, img.width(), img.height());
            if (w, h) == (img.width(), img.height()) {
                img
            } else {
                img.resize_exact(w, h, FilterType::Triangle)
            }
        }
    };

    Ok(img.to_rgba8())
}

fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}

/// Decodes load requests on the blocking pool with at most `max_in_flight`
/// concurrent decodes. A request identical to one already being decoded is
/// dropped; the same slot at a different size is decoded again.
pub async fn run(
    mut load_rx: Receiver<LoadPhoto>,
    to_viewer: Sender<LoaderOutput>,
    cancel: CancellationToken,
    max_in_flight: usize,
) -> Result<()> {
    let mut in_flight: HashSet<(Slot, Fit)> = HashSet::new();
    let mut tasks: JoinSet<(LoadPhoto, Option<image::RgbaImage>)> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => break,

            // Accept new load requests while under limit
            Some(request) = load_rx.recv(), if in_flight.len() < max_in_flight.max(1) => {
                if in_flight.insert((request.slot, request.fit)) {
                    tasks.spawn(async move {
                        let path = request.path.clone();
                        let fit = request.fit;
                        let res = tokio::task::spawn_blocking(move || decode_for_fit(&path, fit)).await;
                        let img = match res {
                            Ok(Ok(img)) => Some(img),
                            Ok(Err(err)) => {
                                debug!("decode failed for {}: {err:#}", request.path.display());
                                None
                            }
                            Err(_) => None,
                        };
                        (request, img)
                    });
                }
            }

            // Handle completed decodes as they finish
            Some(join_res) = tasks.join_next() => {
                let Ok((request, maybe_img)) = join_res else {
                    warn!("decode task aborted");
                    continue;
                };
                in_flight.remove(&(request.slot, request.fit));
                let out = match maybe_img {
                    Some(rgba8) => {
                        debug!(slot = ?request.slot, "loaded (rgba8): {}", request.path.display());
                        let (width, height) = rgba8.dimensions();
                        LoaderOutput::Loaded(PhotoLoaded {
                            slot: request.slot,
                            fit: request.fit,
                            prepared: PreparedImageCpu {
                                path: request.path,
                                width,
                                height,
                                pixels: rgba8.into_raw(),
                            },
                        })
                    }
                    None => {
                        warn!("invalid photo {}", request.path.display());
                        LoaderOutput::Failed(PhotoFailed {
                            slot: request.slot,
                            path: request.path,
                        })
                    }
                };
                if to_viewer.send(out).await.is_err() {
                    debug!("viewer channel closed; exiting loader task");
                    break;
                }
            }

            else => {
                // Request channel closed and nothing in flight.
                break;
            }
        }
    }
    tasks.abort_all();
    Ok(())
}
