use log::info;
use rocket::{post, routes};

/// Demo receiver for callback deliveries: point the upload's `callback`
/// query parameter at this server's own `/callback` to watch outcomes
/// arrive in the log.
#[post("/callback", data = "<body>")]
pub async fn demo_callback(body: String) {
    info!("demo callback endpoint hit. response payload: {}", body);
}

pub fn generate_demo_routes() -> Vec<rocket::Route> {
    routes![demo_callback]
}
