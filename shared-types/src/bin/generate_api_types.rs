use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for the web client
    let mut types = Vec::new();

    // Account types
    types.push(clean_type(Account::export_to_string()?));
    types.push(clean_type(UserKind::export_to_string()?));
    types.push(clean_type(Language::export_to_string()?));

    // Profile types
    types.push(clean_type(CandidateProfile::export_to_string()?));
    types.push(clean_type(CompanyProfile::export_to_string()?));
    types.push(clean_type(Sector::export_to_string()?));

    // Listing types
    types.push(clean_type(Job::export_to_string()?));
    types.push(clean_type(JobType::export_to_string()?));
    types.push(clean_type(JobCompanySummary::export_to_string()?));
    types.push(clean_type(JobListing::export_to_string()?));
    types.push(clean_type(CompanyJobSummary::export_to_string()?));
    types.push(clean_type(CompanyListing::export_to_string()?));

    // Application types
    types.push(clean_type(Application::export_to_string()?));
    types.push(clean_type(ApplicationStatus::export_to_string()?));

    // Auth types
    types.push(clean_type(UserMetadata::export_to_string()?));
    types.push(clean_type(AuthUser::export_to_string()?));
    types.push(clean_type(AuthSession::export_to_string()?));
    types.push(clean_type(AuthEvent::export_to_string()?));
    types.push(clean_type(AuthChange::export_to_string()?));

    let output_dir = Path::new("../web/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // All types land in one file, so cross-type imports are dropped
    let filtered: Vec<&str> = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
