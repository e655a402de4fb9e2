//! Device validation captured as values
//!
//! wgpu routes validation failures to an uncaptured-error handler that panics
//! by default. Resource and pipeline creation during configuration runs inside
//! an error scope instead, so an adapter that cannot build the pipeline yields
//! a `PipelineError` for the caller.

/// Run `create` inside a validation error scope and block until it resolves.
pub fn capture_validation<T>(
    device: &wgpu::Device,
    create: impl FnOnce() -> T,
) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(err) => Err(err.to_string()),
    }
}
