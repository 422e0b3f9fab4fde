//! Initialize a new bidgen project

use anyhow::Result;
use bidgen_core::config::CONFIG_FILE;
use std::fs;
use std::path::Path;

/// Run the init command
pub fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE
        );
    }

    tracing::info!("Creating new bidgen project: {}", project_name);

    fs::create_dir_all(project_dir.join("bidders"))?;

    let config = format!(
        r#"# bidgen project configuration
name: {project_name}

# Root of the prebid-server-java checkout that sources are generated into
output_dir: "."
bidders_dir: bidders

codegen:
  indent: "    "
  model_package: com.iab.openrtb.request
  bidder_package: org.prebid.server.bidder
  ext_package: org.prebid.server.proto.openrtb.ext.request
"#
    );
    fs::write(project_dir.join(CONFIG_FILE), config)?;

    let example = r#"# Example bidder description
bidderName: example
strategy: SINGLE_REQUEST

properties:
  endpointUrl: "https://bidder.example.com/openrtb2/auction"

metaInfo:
  maintainerEmail: "prebid@example.com"
  appMediaTypes: [banner, video]
  siteMediaTypes: [banner, video]

usersyncer:
  cookieFamilyName: example

bidderParams:
  - name: placementId
    type: String
  - name: publisherId
    type: String

transformations:
  - target: imp.tagid
    from: impExt.placementId
  - target: imp.banner.pos
    staticValue: 1
  - target: site.publisher.id
    from: impExt.publisherId
  - target: tmax
    staticValue: 500
"#;
    fs::write(project_dir.join("bidders/example.yaml"), example)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  bidgen validate    # Check bidder descriptions");
    tracing::info!("  bidgen generate    # Write Java sources");

    Ok(())
}
