//! Strip PDF metadata in place: exiftool removes the tags, then qpdf
//! rewrites the file so the removed objects are really gone.

use std::path::PathBuf;

use super::{item_path, BatchTool};
use crate::process::{CommandLine, Plan, PlanError};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

/// `wst pdf-clean`
pub struct PdfClean {
    inputs: Vec<PathBuf>,
}

impl PdfClean {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self { inputs }
    }
}

impl BatchTool for PdfClean {
    fn name(&self) -> &'static str {
        "pdf-clean"
    }

    fn required_programs(&self) -> &[&'static str] {
        &["exiftool", "qpdf"]
    }

    fn workload(&self) -> Workload {
        Workload::Io
    }

    fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
        Ok(WorkListBuilder::new().extensions(&["pdf"]).walk(&self.inputs))
    }

    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        let path = item_path(item)?;
        let strip = CommandLine::new("exiftool")
            .args(["-q", "-all:all=", "-overwrite_original"])
            .arg(path);
        // qpdf exits 3 on warnings; the rewritten file is still valid
        let rewrite = CommandLine::new("qpdf")
            .args(["--linearize", "--warning-exit-0", "--replace-input"])
            .arg(path);
        Ok(Plan::single(strip).then(rewrite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_then_rewrite() {
        let plan = PdfClean::new(Vec::new())
            .plan(&WorkItem::from_path("/docs/report.pdf"))
            .unwrap();
        assert_eq!(
            plan.describe(),
            vec![
                "exiftool -q -all:all= -overwrite_original /docs/report.pdf",
                "qpdf --linearize --warning-exit-0 --replace-input /docs/report.pdf",
            ]
        );
    }
}
