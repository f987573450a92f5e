//! Registry of the record types the migrator knows about.
//!
//! Row migration works on [`RecordKind`] / [`Record`]: one variant per legacy
//! model, each with its own strongly-typed field set. Asset migration works on
//! [`AssetKind`] / [`AssetRow`]: one variant per asset-bearing table, each
//! naming its URL column and destination bucket.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Leading character of an asset URL that still points into the local public folder.
pub const LOCAL_PATH_MARKER: char = '/';

pub fn is_local_path(url: &str) -> bool {
    url.starts_with(LOCAL_PATH_MARKER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    GalleryImage,
    Article,
    Appointment,
    ContactMessage,
    Donation,
}

impl RecordKind {
    /// Fixed order used by the data migration run.
    pub const SEQUENCE: [RecordKind; 5] = [
        RecordKind::GalleryImage,
        RecordKind::Article,
        RecordKind::Appointment,
        RecordKind::ContactMessage,
        RecordKind::Donation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::GalleryImage => "gallery images",
            RecordKind::Article => "articles",
            RecordKind::Appointment => "appointments",
            RecordKind::ContactMessage => "contact messages",
            RecordKind::Donation => "donations",
        }
    }

    /// Model name in the legacy SQLite database.
    pub fn source_table(&self) -> &'static str {
        match self {
            RecordKind::GalleryImage => "GalleryImage",
            RecordKind::Article => "Article",
            RecordKind::Appointment => "Appointment",
            RecordKind::ContactMessage => "ContactMessage",
            RecordKind::Donation => "Donation",
        }
    }

    pub fn destination_table(&self) -> &'static str {
        match self {
            RecordKind::GalleryImage => "gallery_images",
            RecordKind::Article => "articles",
            RecordKind::Appointment => "appointments",
            RecordKind::ContactMessage => "contact_messages",
            RecordKind::Donation => "donations",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryImage {
    pub id: String,
    /// Legacy asset field; duplicated into `image_url` on migration.
    pub src: String,
    pub image_url: Option<String>,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub appointment_time: String,
    pub reason: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub service: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Donation {
    pub name: Option<String>,
    pub email: Option<String>,
    pub amount: f64,
    pub transaction_id: Option<String>,
    pub status: String,
    pub is_recurring: bool,
    pub frequency: Option<String>,
    pub sponsor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    GalleryImage(GalleryImage),
    Article(Article),
    Appointment(Appointment),
    ContactMessage(ContactMessage),
    Donation(Donation),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::GalleryImage(_) => RecordKind::GalleryImage,
            Record::Article(_) => RecordKind::Article,
            Record::Appointment(_) => RecordKind::Appointment,
            Record::ContactMessage(_) => RecordKind::ContactMessage,
            Record::Donation(_) => RecordKind::Donation,
        }
    }

    /// Short human label for per-row log lines.
    pub fn describe(&self) -> String {
        match self {
            Record::GalleryImage(g) => g.title.clone().unwrap_or_else(|| g.id.clone()),
            Record::Article(a) => a.slug.clone(),
            Record::Appointment(a) => format!("{} <{}>", a.name, a.email),
            Record::ContactMessage(m) => format!("{} <{}>", m.name, m.email),
            Record::Donation(d) => d
                .transaction_id
                .clone()
                .unwrap_or_else(|| format!("{:.2} from {}", d.amount, d.name.as_deref().unwrap_or("anonymous"))),
        }
    }

    /// Value the destination holds a unique constraint on, if any.
    pub fn unique_key(&self) -> Option<String> {
        match self {
            Record::GalleryImage(g) => Some(g.id.clone()),
            Record::Article(a) => Some(a.slug.clone()),
            Record::Appointment(a) => Some(a.dedup_key()),
            Record::ContactMessage(m) => Some(m.dedup_key()),
            Record::Donation(d) => Some(d.dedup_key()),
        }
    }

    /// Map a legacy row onto the shape the destination expects.
    pub fn into_destination(self) -> Record {
        match self {
            Record::GalleryImage(mut g) => {
                if g.image_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    g.image_url = Some(g.src.clone());
                }
                Record::GalleryImage(g)
            }
            Record::Article(mut a) => {
                // Asset migration owns article images.
                a.image_url = None;
                Record::Article(a)
            }
            Record::ContactMessage(mut m) => {
                m.read = false;
                Record::ContactMessage(m)
            }
            other => other,
        }
    }
}

/// Hex SHA-256 of the fields, separated by 0x1f.
fn dedup_digest(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn person_digest(name: &str, email: &str, created_at: &DateTime<Utc>) -> String {
    dedup_digest(&[
        name.trim(),
        email.trim().to_ascii_lowercase().as_str(),
        created_at.to_rfc3339_opts(SecondsFormat::Millis, true).as_str(),
    ])
}

impl Appointment {
    pub fn dedup_key(&self) -> String {
        person_digest(&self.name, &self.email, &self.created_at)
    }
}

impl ContactMessage {
    pub fn dedup_key(&self) -> String {
        person_digest(&self.name, &self.email, &self.created_at)
    }
}

impl Donation {
    /// The payment provider's transaction id, or a digest of donor, amount
    /// and time for donations recorded without one.
    pub fn dedup_key(&self) -> String {
        if let Some(tx) = self.transaction_id.as_deref().filter(|t| !t.trim().is_empty()) {
            return tx.to_string();
        }
        dedup_digest(&[
            self.name.as_deref().unwrap_or("").trim(),
            self.email.as_deref().unwrap_or("").trim().to_ascii_lowercase().as_str(),
            format!("{:.2}", self.amount).as_str(),
            self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true).as_str(),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    GalleryImage,
    Article,
    News,
    Partner,
    Team,
    School,
    Image,
}

impl AssetKind {
    /// Fixed order used by the asset migration run.
    pub const SEQUENCE: [AssetKind; 7] = [
        AssetKind::GalleryImage,
        AssetKind::Article,
        AssetKind::News,
        AssetKind::Partner,
        AssetKind::Team,
        AssetKind::School,
        AssetKind::Image,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::GalleryImage => "gallery images",
            AssetKind::Article => "articles",
            AssetKind::News => "news",
            AssetKind::Partner => "partners",
            AssetKind::Team => "team members",
            AssetKind::School => "schools",
            AssetKind::Image => "images",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            AssetKind::GalleryImage => "gallery_images",
            AssetKind::Article => "articles",
            AssetKind::News => "news",
            AssetKind::Partner => "partners",
            AssetKind::Team => "team_members",
            AssetKind::School => "schools",
            AssetKind::Image => "images",
        }
    }

    pub fn url_column(&self) -> &'static str {
        match self {
            AssetKind::Partner | AssetKind::School => "logo_url",
            AssetKind::Team => "photo_url",
            _ => "image_url",
        }
    }

    pub fn bucket(&self) -> &'static str {
        match self {
            AssetKind::GalleryImage => "gallery",
            AssetKind::Article => "articles",
            AssetKind::News => "news",
            AssetKind::Partner => "partners",
            AssetKind::Team => "team",
            AssetKind::School => "schools",
            AssetKind::Image => "images",
        }
    }

    /// Gallery rows keep the legacy `src` column in sync with the asset URL.
    pub fn mirrors_legacy_src(&self) -> bool {
        matches!(self, AssetKind::GalleryImage)
    }
}

/// The slice of an asset-bearing row that asset migration reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRow {
    pub id: String,
    pub url: Option<String>,
    pub storage_path: Option<String>,
}

impl AssetRow {
    pub fn has_local_url(&self) -> bool {
        self.url.as_deref().is_some_and(is_local_path)
    }

    pub fn is_migrated(&self) -> bool {
        self.storage_path.is_some() && !self.has_local_url()
    }

    /// Storage path was written but the URL was never repointed.
    pub fn is_pending(&self) -> bool {
        self.storage_path.is_some() && self.has_local_url()
    }

    pub fn is_candidate(&self) -> bool {
        self.storage_path.is_none() || self.has_local_url()
    }
}
