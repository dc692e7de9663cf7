//! Chart archive and index fixtures

use flate2::Compression;
use flate2::write::GzEncoder;

/// Registry host baked into fixture charts
pub const OLD_REGISTRY: &str = "registry.old.example";

/// Registry host the rewrite phase substitutes in
pub const NEW_REGISTRY: &str = "registry.new.example";

/// Build a gzipped tarball laid out like a packaged chart
///
/// Every file is placed under a `<name>/` root folder.
pub fn chart_tgz(name: &str, version: &str) -> Vec<u8> {
    let chart_yaml = format!("apiVersion: v2\nname: {name}\nversion: {version}\n");
    let values_yaml = format!("image:\n  repository: {OLD_REGISTRY}/{name}\n  tag: {version}\n");
    let deployment = format!(
        "apiVersion: apps/v1\nkind: Deployment\nspec:\n  template:\n    spec:\n      containers:\n        - image: {OLD_REGISTRY}/{name}:{version}\n"
    );

    tgz(&[
        (format!("{name}/Chart.yaml"), chart_yaml.into_bytes()),
        (format!("{name}/values.yaml"), values_yaml.into_bytes()),
        (format!("{name}/templates/deployment.yaml"), deployment.into_bytes()),
    ])
}

/// Gzipped tarball of `(path, content)` pairs, directories added as needed
pub fn tgz(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut dirs = std::collections::BTreeSet::new();

    for (path, content) in files {
        let mut prefix = String::new();
        for part in path.split('/').take(path.split('/').count() - 1) {
            prefix.push_str(part);
            prefix.push('/');
            if dirs.insert(prefix.clone()) {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                builder
                    .append_data(&mut header, &prefix, std::io::empty())
                    .expect("append directory");
            }
        }

        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_slice())
            .expect("append file");
    }

    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

/// `index.yaml` listing one entry per `(chart, version, url)` triple
pub fn index_yaml(entries: &[(&str, &str, &str)]) -> String {
    let mut yaml = String::from("apiVersion: v1\nentries:\n");
    let mut current = None;
    for (chart, version, url) in entries {
        if current != Some(*chart) {
            yaml.push_str(&format!("  {chart}:\n"));
            current = Some(*chart);
        }
        yaml.push_str(&format!(
            "    - name: {chart}\n      version: {version}\n      urls:\n        - {url}\n"
        ));
    }
    yaml.push_str("generated: \"2024-01-01T00:00:00Z\"\n");
    yaml
}
