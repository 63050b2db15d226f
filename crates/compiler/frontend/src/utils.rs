mod fmt;

pub(crate) use fmt::DisplayFn;
