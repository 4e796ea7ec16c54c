//! TIFF to PDF conversion with libtiff's `tiff2pdf`.

use std::path::{Path, PathBuf};

use super::{item_path, output_path, skip_existing, BatchTool};
use crate::process::{CommandLine, Plan, PlanError};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

/// `wst tiff2pdf`
pub struct Tiff2Pdf {
    inputs: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    overwrite: bool,
}

impl Tiff2Pdf {
    pub fn new(inputs: Vec<PathBuf>, output_dir: Option<PathBuf>, overwrite: bool) -> Self {
        Self {
            inputs,
            output_dir,
            overwrite,
        }
    }

    fn output_for(&self, input: &Path) -> PathBuf {
        output_path(input, self.output_dir.as_deref(), "pdf")
    }
}

impl BatchTool for Tiff2Pdf {
    fn name(&self) -> &'static str {
        "tiff2pdf"
    }

    fn required_programs(&self) -> &[&'static str] {
        &["tiff2pdf"]
    }

    fn workload(&self) -> Workload {
        Workload::Cpu
    }

    fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
        let items = WorkListBuilder::new()
            .extensions(&["tif", "tiff"])
            .walk(&self.inputs);
        Ok(skip_existing(items, self.overwrite, |p| self.output_for(p)))
    }

    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        let input = item_path(item)?;
        Ok(Plan::single(
            CommandLine::new("tiff2pdf")
                .arg("-z")
                .arg("-o")
                .arg(self.output_for(input))
                .arg(input),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn plan_writes_pdf_next_to_input() {
        let tool = Tiff2Pdf::new(Vec::new(), None, false);
        let plan = tool.plan(&WorkItem::from_path("/scans/a.tif")).unwrap();
        assert_eq!(plan.describe(), vec!["tiff2pdf -z -o /scans/a.pdf /scans/a.tif"]);
    }

    #[test]
    fn work_list_picks_tiffs_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.tif"), b"").unwrap();
        fs::write(dir.path().join("b.TIFF"), b"").unwrap();
        fs::write(dir.path().join("c.png"), b"").unwrap();

        let tool = Tiff2Pdf::new(vec![dir.path().to_path_buf()], None, false);
        assert_eq!(tool.work_list().unwrap().len(), 2);
    }
}
