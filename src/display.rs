use anyhow::Result;

/// Small text display (LCD/OLED) that mirrors the node's status.
/// Callers ignore failures; a missing display never affects streaming.
pub trait StatusDisplay {
    fn show_lines(&mut self, lines: &[String]) -> Result<()>;
}

/// Fallback display that writes the lines to the log
#[derive(Debug, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show_lines(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            log::info!("[DISP] {}", line);
        }
        Ok(())
    }
}
