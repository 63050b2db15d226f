pub mod annotation {
    pub const TRACKABLE: &str = "com.github.hadilq.trackable.annotations.Trackable";
    pub const TRACK_WITH: &str = "trackWith";
}

pub mod ident {
    pub const TRACK: &str = "track";
}
