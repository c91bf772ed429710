use crate::config::CorsConfig;
use may_minihttp::Response;

/// Cross-origin policy baked from the environment allow-lists at startup.
///
/// The header lines are leaked once at construction (the engine wants
/// `&'static str` headers), so applying the policy per request allocates
/// nothing.
pub struct CorsPolicy {
    headers: Vec<&'static str>,
}

impl CorsPolicy {
    #[must_use]
    pub fn new(config: CorsConfig) -> Self {
        let lines = [
            format!(
                "Access-Control-Allow-Origin: {}",
                config.allow_origins.join(",")
            ),
            format!(
                "Access-Control-Allow-Methods: {}",
                config.allow_methods.join(",")
            ),
            format!(
                "Access-Control-Allow-Headers: {}",
                config.allow_headers.join(",")
            ),
        ];
        CorsPolicy {
            headers: lines
                .into_iter()
                .map(|l| &*Box::leak(l.into_boxed_str()))
                .collect(),
        }
    }

    /// Attach the allow headers to a response.
    pub(crate) fn apply(&self, res: &mut Response) {
        for header in &self.headers {
            res.header(header);
        }
    }
}
