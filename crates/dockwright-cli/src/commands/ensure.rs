use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use dockwright_core::Handler;
use dockwright_runtime::{ImageDescriptor, RuntimeClient};

pub fn run<C: RuntimeClient>(handler: &Handler<C>, image: &str, json: bool) -> Result<u8, String> {
    let resolved = resolve(handler, image)?;

    if json {
        let payload = serde_json::json!({
            "image": image,
            "resolved": resolved,
        });
        println!("{}", json_pretty(&payload)?);
    } else if let Some(descriptor) = &resolved {
        println!("{image} {}", descriptor.id);
    } else {
        eprintln!("warning: {image} was pulled but the runtime still does not list it");
    }

    Ok(if resolved.is_some() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

/// `check_and_pull` behind a spinner.
pub fn resolve<C: RuntimeClient>(
    handler: &Handler<C>,
    image: &str,
) -> Result<Option<ImageDescriptor>, String> {
    let pb = spinner(&format!("resolving {image}…"));
    let resolved = handler.check_and_pull(image).map_err(|e| {
        spin_fail(&pb, &format!("{image} unavailable"));
        e.to_string()
    })?;
    if resolved.is_some() {
        spin_ok(&pb, &format!("{image} available"));
    } else {
        spin_fail(&pb, &format!("{image} not resolvable after pull"));
    }
    Ok(resolved)
}
