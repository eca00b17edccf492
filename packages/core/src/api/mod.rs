// Публичный API ядра для окружающего CRUD-слоя

pub mod keys;
pub mod messaging;

pub use keys::register_user_keys;
pub use messaging::MessageService;
