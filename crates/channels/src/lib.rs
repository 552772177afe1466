//! Channel senders — one send attempt per candidate over an external
//! transport, with per-candidate failure isolation and one analytics
//! event per attempt.

pub mod email;
pub mod sender;
pub mod voice;
pub mod whatsapp;

pub use email::{EmailSender, EmailTransport, ResendTransport};
pub use sender::{ChannelBatchReport, ChannelSender};
pub use voice::{RetellVoiceTransport, VoiceSender, VoiceTransport};
pub use whatsapp::{TwilioWhatsAppTransport, WhatsAppSender, WhatsAppTransport};
