//! Fixtures shared by service tests

use tempfile::TempDir;

use crate::config::paths::SharePaths;
use crate::models::{Envelope, Money, ProfileId, Role, User};
use crate::storage::Storage;

use super::{EnvelopeService, MembershipService, ProfileService, Session, UserService};

pub fn create_test_storage() -> (TempDir, Storage) {
    let temp_dir = TempDir::new().unwrap();
    let paths = SharePaths::with_base_dir(temp_dir.path().to_path_buf());
    let mut storage = Storage::new(paths).unwrap();
    storage.load_all().unwrap();
    (temp_dir, storage)
}

pub fn register(storage: &Storage, email: &str) -> (User, Session) {
    let user = UserService::new(storage).register(email, None).unwrap();
    let session = Session::for_user(user.id);
    (user, session)
}

/// A registered owner with an empty profile
pub fn owner_with_profile(storage: &Storage) -> (Session, ProfileId) {
    let (_, session) = register(storage, "owner@example.com");
    let profile = ProfileService::new(storage)
        .create(&session, "Household", "USD", false)
        .unwrap();
    (session, profile.id)
}

/// Register a user and add them to a profile with `role`
pub fn join(storage: &Storage, profile_id: ProfileId, email: &str, role: Role) -> Session {
    let (user, session) = register(storage, email);
    MembershipService::new(storage)
        .add_member(profile_id, user.id, role)
        .unwrap();
    session
}

pub fn envelope(storage: &Storage, session: &Session, profile_id: ProfileId, name: &str) -> Envelope {
    EnvelopeService::new(storage)
        .create(session, profile_id, name, "Needs", Money::from_cents(50_000))
        .unwrap()
}

pub fn spent(storage: &Storage, envelope: &Envelope) -> i64 {
    storage
        .ledger
        .get_envelope(envelope.id)
        .unwrap()
        .unwrap()
        .spent
        .cents()
}
