use super::{json_pretty, short_id, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use dockwright_core::{Handler, Request};
use dockwright_runtime::RuntimeClient;

/// Ensure every image the request names, then probe the base image.
pub fn run<C: RuntimeClient>(
    handler: &Handler<C>,
    request: &Request,
    json: bool,
) -> Result<u8, String> {
    let pb = spinner("resolving request images…");
    let images = handler.ensure_request_images(request).map_err(|e| {
        spin_fail(&pb, "image resolution failed");
        e.to_string()
    })?;

    let missing: Vec<&str> = request
        .images()
        .zip(&images)
        .filter(|(_, resolved)| resolved.is_none())
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        spin_fail(&pb, "image resolution incomplete");
        return Err(format!(
            "pull error: not resolvable after pulling: {}",
            missing.join(", ")
        ));
    }
    spin_ok(&pb, &format!("{} image(s) available", images.len()));

    let pb = spinner(&format!("probing {}…", request.base_image()));
    let container = handler
        .run_to_completion(request.base_image())
        .map_err(|e| {
            spin_fail(&pb, "probe failed");
            e.to_string()
        })?;
    spin_ok(&pb, "probe passed");

    if json {
        let payload = serde_json::json!({
            "base_image": request.base_image(),
            "runtime_image": request.runtime_image(),
            "images": images,
            "probe_container": container.id,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for name in request.images() {
            println!("ready {name}");
        }
        println!("probe {} passed", short_id(&container.id));
    }
    Ok(EXIT_SUCCESS)
}
