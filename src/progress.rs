use crate::report::format_hms;
use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use regex::Regex;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// File-level bar plus a spinner for the stage currently encoding.
#[derive(Clone)]
pub struct BatchProgress {
    multi: MultiProgress,
    files: ProgressBar,
    stage: ProgressBar,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);

        let files = multi.add(ProgressBar::new(0));
        files.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}]  [{bar:40.cyan/bright-black}] {pos}/{len} videos  {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        let stage = multi.add(ProgressBar::new_spinner());
        stage.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["-", "\\", "|", "/", "+"]),
        );

        Self {
            multi,
            files,
            stage,
        }
    }

    pub fn set_total(&self, total: u64) {
        self.files.set_length(total);
    }

    pub fn start_file(&self, name: &str) {
        self.files.set_message(name.to_string());
    }

    pub fn finish_file(&self) {
        self.files.inc(1);
    }

    pub fn start_stage(&self, index: usize, total: usize, name: &str) {
        self.stage.enable_steady_tick(Duration::from_millis(120));
        self.stage
            .set_message(format!("Stage {}/{}: {name}", index + 1, total));
    }

    /// Shared with the transformer so encoder progress lands on the spinner.
    pub fn stage_bar(&self) -> ProgressBar {
        self.stage.clone()
    }

    pub fn finish(&self) {
        self.stage.finish_and_clear();
        self.files.finish_with_message("Done");
    }

    /// Log sink that clears the bars while a line is written.
    pub fn log_writer(&self) -> LogWriter {
        LogWriter {
            multi: self.multi.clone(),
        }
    }
}

/// Stderr writer for `tracing` that does not tear the progress bars.
#[derive(Clone)]
pub struct LogWriter {
    multi: MultiProgress,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().flush())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn progress_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)=([\w\-\.:]+)$").expect("valid progress regex"))
}

/// Reads ffmpeg's `-progress -` key=value stream into the stage spinner.
pub fn pump_progress<R: Read + Send + 'static>(
    reader: R,
    bar: ProgressBar,
) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || {
        let re_kv = progress_line();
        let reader = BufReader::new(reader);
        let label = bar.message();

        for line in reader.lines() {
            let line = line?;
            if let Some((key, val)) = parse_progress_line(re_kv, &line) {
                match key {
                    "out_time_ms" => {
                        // ffmpeg reports microseconds under this key
                        let micros: u64 = val.parse().unwrap_or(0);
                        let encoded = format_hms(micros as f64 / 1_000_000.0);
                        bar.set_message(format!("{label}  {encoded} encoded"));
                    }
                    "progress" if val == "end" => {
                        bar.set_message(format!("{label}  done"));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    })
}

fn parse_progress_line<'a>(re: &Regex, line: &'a str) -> Option<(&'a str, &'a str)> {
    let caps = re.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_progress_line() {
        let re = progress_line();
        assert_eq!(
            parse_progress_line(re, "out_time_ms=5000000"),
            Some(("out_time_ms", "5000000"))
        );
        assert_eq!(
            parse_progress_line(re, "out_time=00:00:05.000000"),
            Some(("out_time", "00:00:05.000000"))
        );
        assert_eq!(parse_progress_line(re, "progress=end"), Some(("progress", "end")));
        assert_eq!(parse_progress_line(re, "garbage line"), None);
    }

    #[test]
    fn test_pump_updates_stage_message() {
        let bar = ProgressBar::hidden();
        bar.set_message("Stage 1/2: Noise");
        let stream = "frame=10\nout_time_ms=65000000\nprogress=continue\n";
        pump_progress(Cursor::new(stream.as_bytes().to_vec()), bar.clone())
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(bar.message(), "Stage 1/2: Noise  0:01:05 encoded");

        pump_progress(Cursor::new(b"progress=end\n".to_vec()), bar.clone())
            .join()
            .unwrap()
            .unwrap();
        assert!(bar.message().ends_with("done"));
    }

    #[test]
    fn test_batch_progress_counts_files() {
        let progress = BatchProgress::hidden();
        progress.set_total(3);
        progress.start_file("a.mp4");
        progress.finish_file();
        progress.start_stage(0, 2, "Noise");
        assert_eq!(progress.stage_bar().message(), "Stage 1/2: Noise");
        assert_eq!(progress.files.position(), 1);
        assert_eq!(progress.files.length(), Some(3));
    }

    #[test]
    fn test_log_writer_passes_lines_through() {
        use tracing_subscriber::fmt::MakeWriter;

        let progress = BatchProgress::hidden();
        progress.set_total(2);
        let sink = progress.log_writer();
        let mut writer = sink.make_writer();
        assert_eq!(writer.write(b"log line\n").unwrap(), 9);
        writer.flush().unwrap();
        assert_eq!(progress.files.length(), Some(2));
    }
}
