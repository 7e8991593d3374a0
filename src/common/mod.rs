pub const SUPPORTED_VIDEO_MIME: &'static str = "video/mp4";

pub const OUTPUT_JPEG_QUALITY: u8 = 80;

pub const IMAGE_STORAGE_FOLDER_NAME: &'static str = "images";

pub const OUTPUT_STORAGE_FOLDER_NAME: &'static str = "output";

pub const UPLOAD_STAGING_FOLDER_NAME: &'static str = "upload";

pub const FRAME_FILENAME_PATTERN: &'static str = "frames_%d.jpg";
