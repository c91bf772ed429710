use askama::Template;

use super::schema::TsModel;

/// Template for the fixed envelope/error-shape module (`general.ts`).
#[derive(Template)]
#[template(path = "general.ts.txt", escape = "none")]
pub struct GeneralTemplate;

/// Template data for the models module (`models.ts`).
#[derive(Template)]
#[template(path = "models.ts.txt", escape = "none")]
pub struct ModelsTemplate {
    /// Interface declarations in first-registration order.
    pub models: Vec<TsModel>,
}

/// One generated call stub, pre-rendered into template-ready strings.
#[derive(Debug, Clone)]
pub struct StubDef {
    pub function_name: String,
    /// Comma-joined parameter list: path params, form params, then `req`.
    pub params: String,
    /// `Promise<AxiosResponse<Response<T>>>` wrap, or the `void` variant.
    pub return_type: String,
    /// Lowercase transport method (get/post/put/delete).
    pub method: String,
    /// Template-literal URL with `${name}` placeholders and the query
    /// string appended.
    pub url: String,
    pub has_body: bool,
}

/// Template data for the call-stub module (`api.ts`).
#[derive(Template)]
#[template(path = "api.ts.txt", escape = "none")]
pub struct ApiTemplate {
    /// Sorted model names imported at the top of the module.
    pub imports: Vec<String>,
    pub stubs: Vec<StubDef>,
}
