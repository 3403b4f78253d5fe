//! Seeds the database with demo rooms. Wipes existing rooms first; sites
//! are left alone. Run with `cargo run --bin seed`.

use std::path::PathBuf;

use anyhow::anyhow;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use roost_db::models::NewListing;
use roost_db::Database;
use roost_types::models::{ImageRef, ListingKind};

const ROOM_COUNT: usize = 300;

const CITIES: &[(&str, &str, f64, f64)] = &[
    ("Mumbai", "Maharashtra", 72.8777, 19.0760),
    ("Delhi", "Delhi", 77.1025, 28.7041),
    ("Bengaluru", "Karnataka", 77.5946, 12.9716),
    ("Hyderabad", "Telangana", 78.4867, 17.3850),
    ("Chennai", "Tamil Nadu", 80.2707, 13.0827),
    ("Kolkata", "West Bengal", 88.3639, 22.5726),
    ("Pune", "Maharashtra", 73.8567, 18.5204),
    ("Ahmedabad", "Gujarat", 72.5714, 23.0225),
    ("Jaipur", "Rajasthan", 75.7873, 26.9124),
    ("Lucknow", "Uttar Pradesh", 80.9462, 26.8467),
    ("Kochi", "Kerala", 76.2673, 9.9312),
    ("Panaji", "Goa", 73.8278, 15.4909),
    ("Chandigarh", "Chandigarh", 76.7794, 30.7333),
    ("Indore", "Madhya Pradesh", 75.8577, 22.7196),
    ("Bhopal", "Madhya Pradesh", 77.4126, 23.2599),
    ("Nagpur", "Maharashtra", 79.0882, 21.1458),
    ("Surat", "Gujarat", 72.8311, 21.1702),
    ("Coimbatore", "Tamil Nadu", 76.9558, 11.0168),
    ("Guwahati", "Assam", 91.7362, 26.1445),
    ("Varanasi", "Uttar Pradesh", 82.9739, 25.3176),
];

const DESCRIPTORS: &[&str] = &[
    "Sunny", "Cozy", "Quiet", "Spacious", "Modern", "Bright", "Charming", "Peaceful", "Airy",
    "Rustic", "Elegant", "Minimal",
];

const PLACES: &[&str] = &[
    "Studio", "Loft", "Apartment", "Homestay", "Suite", "Villa", "Cottage", "Penthouse",
    "Bungalow", "Flat", "Retreat", "Annexe",
];

const DESCRIPTION: &str = "A comfortable place to stay with natural light, a well-equipped \
kitchen and fast wifi. Close to local markets and public transport, with quiet evenings and \
a friendly host nearby. Linen and towels are provided; longer stays are welcome.";

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost=debug".into()),
        )
        .init();

    let db_path = std::env::var("ROOST_DB_PATH").unwrap_or_else(|_| "roost.db".to_string());
    let db = Database::open(&PathBuf::from(&db_path))?;
    info!("Seeding database at {}", db_path);

    let host_id = ensure_demo_host(&db)?;

    let existing = db.list_listings(ListingKind::Room)?;
    for row in &existing {
        db.delete_listing(ListingKind::Room, &row.id)?;
    }
    info!("Removed {} existing rooms", existing.len());

    let mut rng = rand::rng();
    for i in 0..ROOM_COUNT {
        let (city, state, longitude, latitude) = CITIES[rng.random_range(0..CITIES.len())];
        let descriptor = DESCRIPTORS[rng.random_range(0..DESCRIPTORS.len())];
        let place = PLACES[rng.random_range(0..PLACES.len())];
        let price = rng.random_range(10..30);

        let id = Uuid::new_v4().to_string();
        let title = format!("{descriptor} {place}");
        let location = format!("{city}, {state}");
        let images = vec![
            ImageRef {
                url: format!("https://picsum.photos/seed/roost-{i}-a/800/600"),
                filename: format!("seed/roost-{i}-a"),
            },
            ImageRef {
                url: format!("https://picsum.photos/seed/roost-{i}-b/800/600"),
                filename: format!("seed/roost-{i}-b"),
            },
        ];

        db.insert_listing(
            &NewListing {
                id: &id,
                kind: ListingKind::Room,
                title: &title,
                description: DESCRIPTION,
                location: &location,
                longitude,
                latitude,
                price,
                author_id: &host_id,
            },
            &images,
        )?;
    }

    info!("Seeded {} rooms across {} cities", ROOM_COUNT, CITIES.len());
    Ok(())
}

/// Returns the id of the demo host user, creating it on first run.
fn ensure_demo_host(db: &Database) -> anyhow::Result<String> {
    if let Some(user) = db.get_user_by_username("demohost")? {
        return Ok(user.id);
    }

    let password =
        std::env::var("ROOST_SEED_PASSWORD").unwrap_or_else(|_| "roostdemo".to_string());
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();

    let id = Uuid::new_v4().to_string();
    if !db.create_user(&id, "demohost", "demohost@roost.local", &hash)? {
        return Err(anyhow!("demo host user could not be created"));
    }
    info!("Created demo host user 'demohost'");
    Ok(id)
}
