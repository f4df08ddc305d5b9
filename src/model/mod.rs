pub mod item;
pub mod time_off;
