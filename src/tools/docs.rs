//! readFile 工具：从模拟文档服务器读取文档
//!
//! 与事故剧本无关，属于入职助手流程，保留它作为普通（不设门）工具形态的示例。
//! 文档服务器是 mock：任何路径都返回同一份员工开发手册。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Tool;

const HANDBOOK: &str = r#"# Employee Developer Handbook

## Introduction

Welcome to the company! This handbook is designed to help you get started as a Fullstack Developer. This guide covers everything you need to know about your role, the tech stack we use, and how to set up your development environment.

## Role Overview

As a Fullstack Developer, you'll be working on both frontend and backend development, building scalable web applications using modern JavaScript technologies.

### Key Responsibilities

- Develop and maintain web applications using React, Next.js, and TypeScript
- Build and maintain RESTful APIs using Node.js
- Write clean, maintainable, and well-documented code
- Participate in code reviews and contribute to technical discussions
- Debug and troubleshoot issues across the stack
- Write unit and integration tests

## Tech Stack

- **Frontend Framework**: React 18+
- **Fullstack Framework**: Next.js 14+ (App Router)
- **Runtime**: Node.js 18+ (LTS)
- **Language**: TypeScript 5+
- **Package Manager**: npm
- **Styling**: Tailwind CSS / CSS Modules

## Development Environment Setup

1. Install Node.js 18+ and npm
2. Clone the monorepo and run `npm install`
3. Copy `.env.example` to `.env.local` and fill in the listed secrets
4. Run `npm run dev` and open http://localhost:3000
"#;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ReadFileArgs {
    /// 要读取的文档路径
    file_path: String,
}

/// 文档读取工具（只读）
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "readFile"
    }

    fn description(&self) -> &str {
        "Read a file from the file server."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<ReadFileArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let args: ReadFileArgs = parse_args(args)?;
        if args.file_path.trim().is_empty() {
            return Err(AgentError::InvalidArguments(
                "filePath must not be empty".to_string(),
            ));
        }
        Ok(serde_json::json!({ "fileContent": HANDBOOK }))
    }
}
