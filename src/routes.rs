pub mod csr;
pub mod error;

pub use error::BadRequestRejection;

use serde::Serialize;
use warp::{Filter, Rejection, Reply};

#[derive(Serialize)]
struct Healthz {}

pub fn healthz() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("healthz")
        .and(warp::get())
        .map(|| warp::reply::json(&Healthz {}))
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn healthz_replies_with_empty_object() {
        let res = warp::test::request()
            .method("GET")
            .path("/healthz")
            .reply(&super::healthz())
            .await;
        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "{}");
    }
}
