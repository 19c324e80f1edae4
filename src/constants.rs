pub mod records {

    pub const TABLE: &str = "qr_data";

    pub const TTL_SECONDS: i64 = 5 * 60;

    pub const ID_LEN: usize = 10;

    pub const SELECT_COLUMNS: &str = "id,qr_data,pin_hash,expires_at";
}

pub mod keys {

    pub const PIN_LEN: usize = 4;

    pub const LETTER_COUNT: usize = 2;

    pub const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
}

pub mod session {

    pub const COUNTDOWN_SECONDS: u32 = 300;

    pub const MAX_PAYLOAD_CHARS: usize = 5000;

    pub const FALLBACK_PAYLOAD_CHARS: usize = 1000;

    /// The countdown is shown as urgent below this many seconds.
    pub const URGENT_BELOW_SECONDS: u32 = 60;
}

pub mod messages {

    pub const SAVE_FAILED: &str = "Failed to save data. Please try again.";

    pub const RETRIEVE_FAILED: &str = "Invalid PIN or data expired";

    pub const CAMERA_FAILED: &str = "Failed to start camera. Please check permissions.";
}

pub mod intervals {
    use std::time::Duration;

    pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}
