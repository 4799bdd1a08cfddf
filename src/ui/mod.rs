pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{chat_reply, error, header, section, status, success, table, timing, warn};
pub use progress::Spinner;
pub use table::{load_report_table, stats_table};
pub use theme::{Palette, stderr_palette, stdout_palette};
