/// One step of the sequential workflow, in fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DetectDataset,
    GeneratePipeline,
    GenerateTests,
    ValidateCode,
    ReviewCode,
    GenerateDocs,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::DetectDataset,
        Stage::GeneratePipeline,
        Stage::GenerateTests,
        Stage::ValidateCode,
        Stage::ReviewCode,
        Stage::GenerateDocs,
        Stage::Publish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::DetectDataset => "detect_dataset",
            Stage::GeneratePipeline => "generate_pipeline",
            Stage::GenerateTests => "generate_tests",
            Stage::ValidateCode => "validate_code",
            Stage::ReviewCode => "review_code",
            Stage::GenerateDocs => "generate_docs",
            Stage::Publish => "publish",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
