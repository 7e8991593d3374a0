use anyhow::Result;
use log::info;

mod api;
mod common;
mod config;
mod models;
mod workflow;

use crate::api::handlers::demo::generate_demo_routes;
use crate::api::handlers::media::generate_media_routes;
use crate::config::APP_CONFIG;
use crate::workflow::processors::setup::{check_ffmpeg, initialize_folder, initialize_logger};

use rocket::data::{Limits, ToByteUnit};

fn build_rocket() -> rocket::Rocket<rocket::Build> {
    let upload_limit = APP_CONFIG.max_upload_bytes.bytes();
    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", APP_CONFIG.port))
        .merge((
            "limits",
            Limits::default()
                .limit("file", upload_limit)
                .limit("data-form", upload_limit + 1.mebibytes()),
        ));

    rocket::custom(figment)
        .mount("/", generate_media_routes())
        .mount("/", generate_demo_routes())
}

#[rocket::main]
async fn main() -> Result<()> {
    initialize_logger();
    check_ffmpeg();
    initialize_folder();

    info!("Server started. Listening on port {}", APP_CONFIG.port);
    let _ = build_rocket().launch().await?;
    Ok(())
}
