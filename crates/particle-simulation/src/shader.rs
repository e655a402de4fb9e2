//! WGSL composition and validation
//!
//! Host shaders are opaque text. Before anything touches the device they are
//! prefixed with the bindings this crate owns, then parsed and validated with
//! naga so a malformed program fails at configuration time instead of on the
//! first frame.

use crate::error::PipelineError;
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Bindings, `load_state` and the fullscreen vertex stage for update shaders.
pub const UPDATE_PRELUDE: &str = include_str!("shaders/update_prelude.wgsl");

/// Fragment entry point every update shader must define.
pub const UPDATE_ENTRY_POINT: &str = "update";

/// Vertex entry point supplied by the prelude.
pub const FULLSCREEN_ENTRY_POINT: &str = "fullscreen_vertex";

/// `(group, binding)` pairs declared by [`UPDATE_PRELUDE`].
pub const UPDATE_BINDINGS: &[(u32, u32)] = &[(0, 0), (0, 1)];

/// Prefix a host shader with `prelude`.
pub fn compose(prelude: &str, source: &str) -> String {
    format!("{prelude}\n{source}")
}

/// Parse and validate a complete WGSL module.
pub fn validate(label: &'static str, source: &str) -> Result<naga::Module, PipelineError> {
    let module =
        naga::front::wgsl::parse_str(source).map_err(|err| PipelineError::ShaderParse {
            label,
            message: err.emit_to_string(source),
        })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
    validator
        .validate(&module)
        .map_err(|err| PipelineError::ShaderValidation {
            label,
            message: format!("{err}"),
        })?;

    Ok(module)
}

/// Look up an entry point by name and stage.
pub fn entry_point<'a>(
    module: &'a naga::Module,
    label: &'static str,
    name: &'static str,
    stage: naga::ShaderStage,
) -> Result<&'a naga::EntryPoint, PipelineError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == stage)
        .ok_or(PipelineError::MissingEntryPoint { label, name, stage })
}

/// Vertex attribute locations consumed by an entry point, including those
/// declared on struct arguments.
pub fn input_locations(module: &naga::Module, entry: &naga::EntryPoint) -> Vec<u32> {
    let mut locations = Vec::new();
    for argument in &entry.function.arguments {
        match &argument.binding {
            Some(naga::Binding::Location { location, .. }) => locations.push(*location),
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    locations.extend(members.iter().filter_map(|member| match &member.binding {
                        Some(naga::Binding::Location { location, .. }) => Some(*location),
                        _ => None,
                    }));
                }
            }
        }
    }
    locations
}

/// Reject resource globals outside `allowed`. The pipeline layout only
/// covers the prelude's bind group.
pub fn check_bindings(
    module: &naga::Module,
    label: &'static str,
    allowed: &[(u32, u32)],
) -> Result<(), PipelineError> {
    for (_, global) in module.global_variables.iter() {
        if let Some(naga::ResourceBinding { group, binding }) = &global.binding {
            if !allowed.contains(&(*group, *binding)) {
                return Err(PipelineError::UnexpectedBinding {
                    label,
                    group: *group,
                    binding: *binding,
                });
            }
        }
    }
    Ok(())
}

fn returns_vec4f_at_location_zero(module: &naga::Module, entry: &naga::EntryPoint) -> bool {
    let Some(result) = &entry.function.result else {
        return false;
    };

    let is_vec4f = matches!(
        module.types[result.ty].inner,
        naga::TypeInner::Vector {
            size: naga::VectorSize::Quad,
            scalar: naga::Scalar {
                kind: naga::ScalarKind::Float,
                width: 4,
            },
        }
    );
    let at_zero = matches!(
        &result.binding,
        Some(naga::Binding::Location { location: 0, .. })
    );

    is_vec4f && at_zero
}

/// Compose an update shader with [`UPDATE_PRELUDE`] and check its contract:
/// a fragment entry point named `update` writing one `vec4<f32>` to location 0,
/// reading nothing from the fullscreen vertex stage and binding nothing beyond
/// the prelude.
pub fn compile_update_shader(source: &str) -> Result<String, PipelineError> {
    const LABEL: &str = "update";

    let composed = compose(UPDATE_PRELUDE, source);
    let module = validate(LABEL, &composed)?;
    check_bindings(&module, LABEL, UPDATE_BINDINGS)?;

    let update = entry_point(&module, LABEL, UPDATE_ENTRY_POINT, naga::ShaderStage::Fragment)?;
    if !returns_vec4f_at_location_zero(&module, update) {
        return Err(PipelineError::UpdateOutput {
            name: UPDATE_ENTRY_POINT,
        });
    }
    // The fullscreen triangle has no varyings
    if let Some(&location) = input_locations(&module, update).first() {
        return Err(PipelineError::UnexpectedInput {
            name: UPDATE_ENTRY_POINT,
            location,
        });
    }

    Ok(composed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADD_ONE_X: &str = r#"
@fragment
fn update(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    return load_state(texel_coord(frag_coord)) + vec4<f32>(1.0, 0.0, 0.0, 0.0);
}
"#;

    #[test]
    fn prelude_alone_is_valid() {
        validate("prelude", UPDATE_PRELUDE).expect("prelude should validate");
    }

    #[test]
    fn well_formed_update_shader_compiles() {
        let composed = compile_update_shader(ADD_ONE_X).unwrap();
        assert!(composed.starts_with(UPDATE_PRELUDE));
        assert!(composed.contains("fn update"));
    }

    #[test]
    fn neighbour_reads_are_allowed() {
        let source = r#"
@fragment
fn update(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let c = texel_coord(frag_coord);
    let avg = (load_state(c + vec2<i32>(1, 0)) + load_state(c - vec2<i32>(1, 0))) * 0.5;
    return vec4<f32>(avg.xyz + vec3<f32>(sim.delta), load_state(c).w);
}
"#;
        compile_update_shader(source).unwrap();
    }

    #[test]
    fn syntax_error_is_reported_at_parse() {
        let err = compile_update_shader("@fragment fn update( -> {").unwrap_err();
        assert!(matches!(err, PipelineError::ShaderParse { label: "update", .. }));
    }

    #[test]
    fn missing_entry_point() {
        let source = r#"
@fragment
fn advance(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    return load_state(texel_coord(frag_coord));
}
"#;
        let err = compile_update_shader(source).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingEntryPoint {
                name: "update",
                stage: naga::ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn wrong_output_arity_is_rejected() {
        let source = r#"
@fragment
fn update(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec3<f32> {
    return load_state(texel_coord(frag_coord)).xyz;
}
"#;
        let err = compile_update_shader(source).unwrap_err();
        assert!(matches!(err, PipelineError::UpdateOutput { name: "update" }));
    }

    #[test]
    fn integer_output_is_rejected() {
        let source = r#"
@fragment
fn update(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<u32> {
    return vec4<u32>(1u);
}
"#;
        assert!(matches!(
            compile_update_shader(source),
            Err(PipelineError::UpdateOutput { .. })
        ));
    }

    #[test]
    fn redeclaring_a_prelude_binding_fails_validation() {
        let source = r#"
@group(0) @binding(0) var state_read: texture_2d<f32>;

@fragment
fn update(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(0.0);
}
"#;
        assert!(compile_update_shader(source).is_err());
    }

    #[test]
    fn extra_resource_binding_is_rejected() {
        let source = r#"
@group(0) @binding(2) var<uniform> gravity: vec4<f32>;

@fragment
fn update(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    return load_state(texel_coord(frag_coord)) + gravity;
}
"#;
        assert!(matches!(
            compile_update_shader(source),
            Err(PipelineError::UnexpectedBinding {
                label: "update",
                group: 0,
                binding: 2,
            })
        ));
    }

    #[test]
    fn update_cannot_read_varyings() {
        let source = r#"
@fragment
fn update(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;
        assert!(matches!(
            compile_update_shader(source),
            Err(PipelineError::UnexpectedInput {
                name: "update",
                location: 0,
            })
        ));
    }

    #[test]
    fn struct_attribute_locations_are_collected() {
        let source = r#"
struct VertexInput {
    @location(0) reference: vec2<f32>,
    @location(1) seed: vec3<f32>,
};

@vertex
fn vs_main(input: VertexInput, @location(4) extra: f32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(input.seed + vec3<f32>(input.reference, extra), 1.0);
}
"#;
        let module = validate("test", source).unwrap();
        let vs = entry_point(&module, "test", "vs_main", naga::ShaderStage::Vertex).unwrap();
        let mut locations = input_locations(&module, vs);
        locations.sort_unstable();
        assert_eq!(locations, vec![0, 1, 4]);
    }
}
