//! FLAC to MP3 conversion: `flac -d` piped into `lame`.

use std::path::{Path, PathBuf};

use super::{item_path, output_path, skip_existing, BatchTool, InvalidArgument};
use crate::process::{CommandLine, Plan, PlanError};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

/// `wst flac2mp3`
pub struct Flac2Mp3 {
    inputs: Vec<PathBuf>,
    quality: u32,
    output_dir: Option<PathBuf>,
    overwrite: bool,
}

impl Flac2Mp3 {
    /// `quality` is lame's VBR quality, 0 (best) to 9.
    pub fn new(
        inputs: Vec<PathBuf>,
        quality: u32,
        output_dir: Option<PathBuf>,
        overwrite: bool,
    ) -> Result<Self, InvalidArgument> {
        if quality > 9 {
            return Err(InvalidArgument::new(
                "--quality",
                quality.to_string(),
                "must be 0-9",
            ));
        }
        Ok(Self {
            inputs,
            quality,
            output_dir,
            overwrite,
        })
    }

    fn output_for(&self, input: &Path) -> PathBuf {
        output_path(input, self.output_dir.as_deref(), "mp3")
    }
}

impl BatchTool for Flac2Mp3 {
    fn name(&self) -> &'static str {
        "flac2mp3"
    }

    fn required_programs(&self) -> &[&'static str] {
        &["flac", "lame"]
    }

    fn workload(&self) -> Workload {
        Workload::Cpu
    }

    fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
        let items = WorkListBuilder::new().extensions(&["flac"]).walk(&self.inputs);
        Ok(skip_existing(items, self.overwrite, |p| self.output_for(p)))
    }

    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        let input = item_path(item)?;
        let decode = CommandLine::new("flac").args(["-d", "-c", "-s"]).arg(input);
        let encode = CommandLine::new("lame")
            .arg("--quiet")
            .arg("-V")
            .arg(self.quality.to_string())
            .arg("-")
            .arg(self.output_for(input));
        Ok(Plan::new().then_pipe(decode, encode))
    }
}
