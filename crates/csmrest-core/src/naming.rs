use chrono::Utc;
use uuid::Uuid;

/// `<prefix><unix seconds>`, e.g. `sampleb1700000000`.
pub fn timestamped(prefix: &str) -> String {
    format!("{}{}", prefix, Utc::now().timestamp())
}

/// Like [`timestamped`] with a short random tail, for names that must stay
/// distinct when created within the same second.
pub fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}{}{}", prefix, Utc::now().timestamp(), &id[..6])
}

pub fn email_for(name: &str) -> String {
    format!("{}@seagate.com", name)
}
