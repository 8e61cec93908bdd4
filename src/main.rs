use csr_client::config::{self, get_default_algorithm, get_host, get_port};
use csr_client::error_handler::handle_rejection;
use csr_client::routes;
use csr_client::{CsrGenerator, OsRngKeyPairGenerator};
use log::info;
use warp::Filter;

#[tokio::main]
async fn main() {
    env_logger::init();

    // Extract config with a CSR env var prefix
    let config = config::new("CSR").unwrap();

    // Determine where to listen and which algorithm to default to
    let port = get_port(&config);
    let host = get_host(&config);
    let default_algorithm = get_default_algorithm(&config);

    // Key pairs come from the OS random source
    let generator = CsrGenerator::new(OsRngKeyPairGenerator, default_algorithm);

    // Any origin may ask for a CSR
    let cors_post = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    // Build out routes
    let routes = routes::healthz()
        .or(routes::csr::post(generator).with(cors_post))
        .with(warp::log("csr_client::routes"))
        .recover(handle_rejection);

    // Start the server
    info!(
        "starting server listening on {}:{}, default algorithm {}",
        host, port, default_algorithm
    );
    warp::serve(routes).run((host, port)).await;
}
