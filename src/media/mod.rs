pub mod media_handlers;
pub mod media_models;
pub mod media_repository;
pub mod media_service;
pub mod media_storage;
pub mod media_sweeper;

pub use media_handlers::{delete_file, download_file};
pub use media_models::{MediaResponse, TaskMedia, Upload};
pub use media_repository::MediaRepository;
pub use media_service::MediaService;
pub use media_storage::MediaStorage;
pub use media_sweeper::start_orphan_sweeper;
