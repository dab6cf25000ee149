pub mod dispatcher;
pub mod telegram;

pub use dispatcher::{
    announce, deliver_files, DeliveryFailure, DeliveryPolicy, DeliveryReport, Messenger,
};
pub use telegram::{SendMethod, TelegramBot};
