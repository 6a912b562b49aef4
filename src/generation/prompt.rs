//! Prompt builders for the four generation calls.
//!
//! Every prompt asks for a JSON object so replies can be parsed by
//! `generation::reply`; the parsers tolerate prose replies regardless.

pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn pipeline_prompt(requirement: &str, dataset_context: Option<&str>) -> Prompt {
    let system = r#"You are an expert PySpark data engineer. Your task is to convert user stories into production-ready PySpark data pipeline code.

Requirements:
1. Generate clean, production-ready PySpark code
2. Include proper error handling and logging
3. Use best practices for Spark (broadcast variables, partitioning, etc.)
4. Include data validation and quality checks
5. Add comprehensive docstrings
6. Follow PEP 8 style guidelines
7. Make the code modular and reusable

The code should be a complete, runnable PySpark pipeline that can be executed independently."#
        .to_string();

    let dataset_section = match dataset_context {
        Some(context) => format!(
            "\nA known dataset matches this story. Use its schema and file path:\n```json\n{context}\n```\n"
        ),
        None => String::new(),
    };

    let user = format!(
        r#"Convert the following user story into PySpark data pipeline code:

User Story:
{requirement}
{dataset_section}
Please generate:
1. Complete PySpark pipeline code
2. A descriptive file name (e.g., pipeline_name.py)
3. A brief description of what the pipeline does

Return your response as JSON with the following structure:
{{
    "file_name": "pipeline_name.py",
    "description": "Brief description",
    "code": "Complete PySpark code here"
}}"#
    );

    Prompt { system, user }
}

pub fn tests_prompt(pipeline_code: &str, pipeline_description: &str) -> Prompt {
    let system = r#"You are an expert in writing comprehensive unit tests for PySpark data pipelines. Your task is to generate production-quality test code.

Requirements:
1. Use pytest and pyspark testing best practices
2. Include unit tests for all major functions
3. Test edge cases and error scenarios
4. Use mock data and fixtures appropriately
5. Include test data setup and teardown
6. Follow pytest conventions and naming

The tests should be comprehensive and cover the pipeline's functionality thoroughly."#
        .to_string();

    let user = format!(
        r#"Generate comprehensive test code for the following PySpark pipeline:

Pipeline Description:
{pipeline_description}

Pipeline Code:
```python
{pipeline_code}
```

Please generate:
1. Complete test code using pytest
2. A descriptive test file name (e.g., test_pipeline_name.py)
3. A brief description of what the tests cover

Return your response as JSON with the following structure:
{{
    "file_name": "test_pipeline_name.py",
    "description": "Brief description of test coverage",
    "code": "Complete test code here"
}}"#
    );

    Prompt { system, user }
}

pub fn review_prompt(pipeline_code: &str, test_code: &str, pipeline_description: &str) -> Prompt {
    let system = r#"You are an expert code reviewer specializing in PySpark data pipelines. Your task is to review code for:
1. Code quality and best practices
2. Performance optimizations
3. Error handling and robustness
4. Test coverage and quality
5. Documentation and maintainability

Provide constructive feedback and specific suggestions for improvement."#
        .to_string();

    let user = format!(
        r#"Review the following PySpark pipeline code and its tests:

Pipeline Description:
{pipeline_description}

Pipeline Code:
```python
{pipeline_code}
```

Test Code:
```python
{test_code}
```

Please provide:
1. A comprehensive code review
2. Specific suggestions for improvement (as a list)
3. A quality score from 0-100
4. Whether the code is approved (true/false)

Return your response as JSON with the following structure:
{{
    "review": "Detailed review text",
    "suggestions": ["suggestion1", "suggestion2"],
    "score": 85.5,
    "approved": true
}}"#
    );

    Prompt { system, user }
}

pub fn docs_prompt(pipeline_code: &str, pipeline_description: &str, requirement: &str) -> Prompt {
    let system = r#"You are a technical writer specializing in data engineering documentation. Your task is to create comprehensive, clear, and useful documentation for PySpark data pipelines.

The documentation should include:
1. Overview and purpose
2. Input/output specifications
3. Configuration requirements
4. Usage examples
5. Dependencies and requirements

Format the documentation in Markdown."#
        .to_string();

    let user = format!(
        r#"Generate comprehensive documentation for the following PySpark pipeline:

User Story:
{requirement}

Pipeline Description:
{pipeline_description}

Pipeline Code:
```python
{pipeline_code}
```

Please generate:
1. Complete documentation in Markdown format
2. A descriptive file name (e.g., README.md or pipeline_name.md)
3. A brief description of the documentation

Return your response as JSON with the following structure:
{{
    "file_name": "README.md",
    "description": "Brief description",
    "content": "Complete Markdown documentation here"
}}"#
    );

    Prompt { system, user }
}
