pub mod api_client;
pub mod task_poller;
