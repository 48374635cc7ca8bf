//! Golden test vectors for deterministic verification.
//!
//! Keys already issued to terminals must keep validating, so these vectors
//! pin the derivation byte for byte.

use chrono::{DateTime, TimeZone, Utc};

use license_manager_core::{
    derive, DerivationPolicy, DerivedKey, LicenseKey, MachineId, SeedMode, ValidityWindow,
};

/// 2026-02-13T12:00:00Z.
pub const NOON: i64 = 1_770_984_000;

/// A golden derivation vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub license_email: &'static str,
    /// Raw machine id, before normalization.
    pub machine_id: &'static str,
    /// Generation time, Unix seconds.
    pub generated_at: i64,
    pub seed_mode: SeedMode,
    pub validity_minutes: u32,
    pub expected_key: &'static str,
}

impl GoldenVector {
    pub fn generated_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.generated_at, 0)
            .single()
            .expect("golden timestamp in range")
    }

    pub fn policy(&self) -> DerivationPolicy {
        DerivationPolicy::new(self.license_email)
            .seed_mode(self.seed_mode)
            .validity(ValidityWindow::from_minutes(self.validity_minutes))
    }
}

/// A golden vector for the mixing function alone.
#[derive(Debug, Clone)]
pub struct SeedVector {
    pub name: &'static str,
    pub seed: &'static str,
    pub expected_key: &'static str,
}

/// Get all golden derivation vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    let windowed = |name, machine_id, generated_at, validity_minutes, expected_key| GoldenVector {
        name,
        license_email: "ops@example.com",
        machine_id,
        generated_at,
        seed_mode: SeedMode::Windowed,
        validity_minutes,
        expected_key,
    };

    vec![
        windowed(
            "windowed, bucket start",
            "DESKTOP-123",
            NOON,
            10,
            "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7",
        ),
        windowed(
            "windowed, inside the same bucket",
            "DESKTOP-123",
            NOON + 5 * 60,
            10,
            "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7",
        ),
        windowed(
            "windowed, next bucket",
            "DESKTOP-123",
            NOON + 10 * 60,
            10,
            "Fw2Zv5Mx9W&k9Fv4Te4Wr#2Tu5Cz4Qi8",
        ),
        windowed(
            "windowed, raw id needs normalizing",
            " desktop-123 ",
            NOON,
            10,
            "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7",
        ),
        windowed(
            "windowed, punctuation in id",
            "POS-TERMINAL_07.A",
            NOON,
            10,
            "Tk7Fy9Qy8M*s4Wu8Ts3Wx$7Tg9Md7Zr2",
        ),
        windowed(
            "windowed, 60 minute bucket start",
            "DESKTOP-123",
            NOON,
            60,
            "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7",
        ),
        windowed(
            "windowed, 60 minute bucket end",
            "DESKTOP-123",
            NOON + 59 * 60,
            60,
            "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7",
        ),
        windowed(
            "windowed, 7 minute bucket before noon",
            "DESKTOP-123",
            NOON,
            7,
            "Vv3Bi7Yi8B@x8Lp5Eh8Yc!4Hb9Sy9Hm5",
        ),
        windowed(
            "windowed, 7 minute bucket after noon",
            "DESKTOP-123",
            NOON + 6 * 60,
            7,
            "Vz4Bm4Sp3S@z8Sy7Bk8Yd*6Vd3Bc8Ee7",
        ),
        GoldenVector {
            name: "windowed, other seed email",
            license_email: "mahiltechlab.ops@gmail.com",
            machine_id: "DESKTOP-123",
            generated_at: NOON,
            seed_mode: SeedMode::Windowed,
            validity_minutes: 10,
            expected_key: "Tn3Th4Zm9M*y4Tg4Qw8Fv@2Jn6Jv2Tk2",
        },
        GoldenVector {
            name: "pos_static",
            license_email: "ops@example.com",
            machine_id: "DESKTOP-123",
            generated_at: NOON,
            seed_mode: SeedMode::PosStatic,
            validity_minutes: 10,
            expected_key: "Sy2Hj6Va9E?m3Pc5Hi8Pp&7Lq2Pw2Vh3",
        },
        GoldenVector {
            name: "pos_static, a day later",
            license_email: "ops@example.com",
            machine_id: "DESKTOP-123",
            generated_at: NOON + 86_400,
            seed_mode: SeedMode::PosStatic,
            validity_minutes: 10,
            expected_key: "Sy2Hj6Va9E?m3Pc5Hi8Pp&7Lq2Pw2Vh3",
        },
    ]
}

/// Get all mixing-function vectors.
pub fn seed_vectors() -> Vec<SeedVector> {
    vec![
        SeedVector {
            name: "empty seed",
            seed: "",
            expected_key: "Vn4Yx9Sw6Y@d6Yr3Bb4Hq&8Hc2Ev6Sk4",
        },
        SeedVector {
            name: "windowed seed",
            seed: "OPS@EXAMPLE.COM|DESKTOP-123|202602131200",
            expected_key: "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7",
        },
        SeedVector {
            name: "non-ASCII seed",
            seed: "OPS@EXAMPLE.COM|KASSE-ÄÖ1",
            expected_key: "Gx4Kx3Nb9D&y8Rb4Gg7Rv#8Nn2Nk7Df4",
        },
    ]
}

/// Derive the key for a vector.
pub fn derive_from_vector(vector: &GoldenVector) -> DerivedKey {
    let machine_id = MachineId::parse(vector.machine_id).expect("golden machine id is valid");
    derive(&machine_id, vector.generated_at(), &vector.policy())
}

/// Verify all vectors and return (name, passed, actual key).
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let derived = all_vectors().into_iter().map(|v| {
        let key = derive_from_vector(&v).key.into_string();
        (v.name.to_string(), key == v.expected_key, key)
    });
    let mixed = seed_vectors().into_iter().map(|v| {
        let key = LicenseKey::from_seed(v.seed).into_string();
        (v.name.to_string(), key == v.expected_key, key)
    });
    derived.chain(mixed).collect()
}
