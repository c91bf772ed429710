//! Client-binding generation: a pure, read-only pass over the registry's
//! endpoint descriptors that emits the TypeScript client modules.
//!
//! Output layout (the directory is removed and recreated on every run):
//!
//! ```text
//! <out_dir>/
//! ├── general.ts   # envelope + error shape, matches the wire envelope
//! ├── models.ts    # one interface per registered model declaration
//! └── api.ts       # axios call stubs + aggregated model imports
//! ```

mod schema;
mod templates;

pub use schema::{model_from_decl, strip_array_marker, ts_type, TsField, TsModel};
pub use templates::{ApiTemplate, GeneralTemplate, ModelsTemplate, StubDef};

use crate::error::ConfigError;
use crate::registry::{ClientOpt, Registry};
use askama::Template;
use http::Method;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Generate the three client modules for every endpoint carrying client
/// metadata. Missing function names and verbs the generated transport
/// cannot express fail immediately; nothing is written until every stub
/// has been built.
pub fn generate(registry: &Registry, out_dir: &Path) -> Result<(), ConfigError> {
    let mut imports = BTreeSet::new();
    let mut stubs = Vec::new();
    let mut models = Vec::new();
    let mut seen_models = BTreeSet::new();

    for endpoint in registry.endpoints() {
        let Some(opt) = endpoint.opts.as_ref().and_then(|o| o.client.as_ref()) else {
            continue;
        };

        if let Some(body) = &opt.body {
            imports.insert(strip_array_marker(body));
        }
        if let Some(response) = &opt.response {
            imports.insert(strip_array_marker(response));
        }
        for decl in &opt.models {
            if seen_models.insert(decl.name.clone()) {
                models.push(model_from_decl(decl));
            }
        }

        stubs.push(build_stub(&endpoint.method, &endpoint.path, opt)?);
    }

    // Clean slate: no incremental merge with prior output.
    let _ = fs::remove_dir_all(out_dir);
    fs::create_dir_all(out_dir)?;

    fs::write(out_dir.join("general.ts"), render(&GeneralTemplate)?)?;
    fs::write(
        out_dir.join("models.ts"),
        render(&ModelsTemplate { models })?,
    )?;
    let stub_count = stubs.len();
    fs::write(
        out_dir.join("api.ts"),
        render(&ApiTemplate {
            imports: imports.into_iter().collect(),
            stubs,
        })?,
    )?;

    info!(out_dir = %out_dir.display(), stubs = stub_count, "client bindings generated");
    Ok(())
}

fn render<T: Template>(template: &T) -> Result<String, ConfigError> {
    template
        .render()
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))
}

/// Build one call stub from an endpoint's declaration.
fn build_stub(method: &Method, path: &str, opt: &ClientOpt) -> Result<StubDef, ConfigError> {
    if opt.function_name.is_empty() {
        return Err(ConfigError::MissingFunctionName {
            path: path.to_string(),
        });
    }

    let verb = if *method == Method::GET {
        "get"
    } else if *method == Method::POST {
        "post"
    } else if *method == Method::PUT {
        "put"
    } else if *method == Method::DELETE {
        "delete"
    } else {
        return Err(ConfigError::UnsupportedMethod {
            method: method.clone(),
            path: path.to_string(),
        });
    };

    let mut params: Vec<String> = opt
        .paths
        .iter()
        .chain(opt.forms.iter())
        .map(|p| format!("{p}: any"))
        .collect();
    if let Some(body) = &opt.body {
        params.push(format!("req: {body}"));
    }

    let return_type = match &opt.response {
        Some(response) => format!("Promise<AxiosResponse<Response<{response}>>>"),
        None => "Promise<AxiosResponse<Response<void>>>".to_string(),
    };

    Ok(StubDef {
        function_name: opt.function_name.clone(),
        params: params.join(", "),
        return_type,
        method: verb.to_string(),
        url: format!("{}{}", rewrite_path(path), query_string(&opt.forms)),
        has_body: opt.body.is_some(),
    })
}

/// Rewrite `:name` path segments into `${name}` interpolation placeholders.
pub fn rewrite_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if let Some(name) = seg.strip_prefix(':') {
                format!("${{{name}}}")
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the literal query string for the declared form fields, with no
/// trailing separator.
pub fn query_string(forms: &[String]) -> String {
    if forms.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = forms.iter().map(|f| format!("{f}=${{{f}}}")).collect();
    format!("?{}", pairs.join("&"))
}
