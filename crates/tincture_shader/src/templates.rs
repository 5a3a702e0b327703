//! Program Templates
//!
//! Vertex and fragment programs are rendered from `minijinja` templates
//! embedded from the crate's `templates/` directory. Templates use
//! `{$ ... $}` for blocks, `{{ ... }}` for values and `$$` for line
//! statements. A template is named by its path without the `.sksl`
//! extension; a bare `include` name resolves under `chunks/`.

use std::sync::OnceLock;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior};
use rust_embed::RustEmbed;
use serde::Serialize;
use tincture_core::{Result, TinctureError};

const EXTENSION: &str = ".sksl";

static PROGRAM_ENV: OnceLock<std::result::Result<Environment<'static>, String>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "templates"]
struct ProgramTemplates;

fn env() -> Result<&'static Environment<'static>> {
    PROGRAM_ENV
        .get_or_init(build_env)
        .as_ref()
        .map_err(|e| TinctureError::Template(e.clone()))
}

fn build_env() -> std::result::Result<Environment<'static>, String> {
    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()
        .map_err(|e| format!("invalid template syntax: {e}"))?;

    let mut env = Environment::new();
    env.set_syntax(syntax);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::SemiStrict);
    env.set_loader(load_program_template);
    env.set_path_join_callback(|name, _parent| {
        if name.contains('/') {
            name.to_string().into()
        } else {
            format!("chunks/{name}").into()
        }
    });
    Ok(env)
}

/// Debug builds of `rust-embed` read the file from disk, so template edits
/// show up without a rebuild.
fn load_program_template(name: &str) -> std::result::Result<Option<String>, Error> {
    let Some(file) = ProgramTemplates::get(&format!("{name}{EXTENSION}")) else {
        return Ok(None);
    };
    String::from_utf8(file.data.into_owned()).map(Some).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("template {name} is not UTF-8: {e}"),
        )
    })
}

/// Renders the template `name` with `context`.
pub fn render<S: Serialize>(name: &str, context: &S) -> Result<String> {
    let template = env()?
        .get_template(name)
        .map_err(|e| TinctureError::Template(format!("{name}: {e}")))?;
    template
        .render(context)
        .map_err(|e| TinctureError::Template(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Slots {
        uniforms_set: u32,
        intrinsic_binding: u32,
        render_step_binding: u32,
    }

    #[derive(Serialize)]
    struct Context {
        slots: Slots,
        step_uniforms: Vec<String>,
    }

    #[test]
    fn intrinsics_chunk_renders() {
        let out = render(
            "chunks/intrinsics",
            &Context {
                slots: Slots {
                    uniforms_set: 0,
                    intrinsic_binding: 0,
                    render_step_binding: 1,
                },
                step_uniforms: vec!["layout(offset=0) float4 bounds;".into()],
            },
        )
        .unwrap();
        assert!(out.contains("uniform IntrinsicUniforms"));
        assert!(out.contains("binding=1) uniform StepUniforms"));
        assert!(out.contains("    layout(offset=0) float4 bounds;"));
    }

    #[test]
    fn embedded_templates_parse() {
        let env = env().unwrap();
        let mut names: Vec<String> = ProgramTemplates::iter()
            .map(|path| path.trim_end_matches(EXTENSION).to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["chunks/intrinsics", "fragment", "vertex"]);
        for name in &names {
            assert!(env.get_template(name).is_ok(), "{name} does not parse");
        }
    }

    #[test]
    fn missing_template_is_an_error() {
        assert!(matches!(
            render("no_such_program", &()),
            Err(TinctureError::Template(_))
        ));
    }
}
