use crate::generator::{CsrGenerator, GenerateOptions};
use crate::key::KeyPairGenerator;
use crate::routes::BadRequestRejection;
use crate::subject::SubjectIdentity;
use serde::{Deserialize, Serialize};
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BodyParams {
    pub subject: SubjectIdentity,
    pub options: GenerateOptions,
}

impl BodyParams {
    /// An empty body stands for `{}`
    fn parse(body: &[u8]) -> Result<Self, BadRequestRejection> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(BodyParams::default());
        }
        serde_json::from_slice(body).or(Err(BadRequestRejection))
    }
}

pub fn post<G: KeyPairGenerator + 'static>(
    generator: CsrGenerator<G>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::any()
        .and(warp::path!("csr"))
        .and(warp::post())
        .and(warp::body::bytes())
        .and(warp::any().map(move || generator.clone()))
        .and_then(
            move |body: Bytes, generator: CsrGenerator<G>| async move {
                let params = BodyParams::parse(&body).map_err(warp::reject::custom)?;
                generator
                    .generate(params.subject, params.options)
                    .await
                    .map(|result| warp::reply::json(&result))
                    .map_err(Rejection::from)
            },
        )
}
