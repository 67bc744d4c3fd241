use name_splitter::*;
use std::path::Path;

fn two_by_two() -> ImageData {
    ImageData::from_rows(vec![
        vec![[10, 10, 10, 255], [20, 20, 20, 255]],
        vec![[30, 30, 30, 255], [40, 40, 40, 255]],
    ])
    .unwrap()
}

fn background_layers(image: ImageData) -> Vec<LayerNode> {
    let bbox = [0, 0, i64::from(image.width()), i64::from(image.height())];
    vec![LayerNode::leaf("BG", Some(LayerPixels { bbox, image }))]
}

fn split_config(rows: u32, cols: u32) -> Config {
    let mut cfg = Config::default();
    cfg.grid = GridConfig {
        rows,
        cols,
        order: GridOrder::LtrTtb,
        ..Default::default()
    };
    cfg.merge.layer_rules = vec![MergeRule::layer("BG", "bg")];
    cfg.output.layer_stack = vec!["bg".to_string()];
    cfg
}

fn image_size(path: &Path) -> (u32, u32) {
    let image = image::open(path).unwrap();
    (image.width(), image.height())
}

#[test]
fn test_render_pages_writes_ppm() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = split_config(1, 2);
    cfg.output.raster_ext = "ppm".to_string();
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(two_by_two()), &cfg.merge, Some((2, 2)));

    let pages = render_pages(dir.path(), &cells, &cfg, &[0, 1], &merge, |_, _, _| {}).unwrap();

    assert_eq!(pages.len(), 2);
    for page in &pages {
        let path = page.layer_path("bg").unwrap();
        assert!(path.exists());
        assert_eq!(image_size(path), (1, 2));
    }
}

#[test]
fn test_layers_layout_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = split_config(1, 2);
    cfg.output.layer_stack = vec!["bg".to_string(), "missing".to_string()];
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(two_by_two()), &cfg.merge, Some((2, 2)));

    let pages = render_pages(dir.path(), &cells, &cfg, &[0, 1], &merge, |_, _, _| {}).unwrap();

    assert_eq!(pages[0].page_dir, dir.path());
    assert_eq!(
        pages[0].layer_path("bg").unwrap(),
        dir.path().join("bg").join("page_001.png")
    );
    assert_eq!(
        pages[1].layer_path("missing").unwrap(),
        dir.path().join("missing").join("page_002.png")
    );

    let bg = image::open(dir.path().join("bg/page_002.png")).unwrap().to_rgba8();
    assert_eq!(bg.get_pixel(0, 0).0, [20, 20, 20, 255]);
    assert_eq!(bg.get_pixel(0, 1).0, [40, 40, 40, 255]);

    // A layer without a composite is written transparent
    let missing = image::open(dir.path().join("missing/page_001.png")).unwrap().to_rgba8();
    assert_eq!(missing.dimensions(), (1, 2));
    assert!(missing.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn test_pages_layout_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = split_config(2, 1);
    cfg.output.layout = OutputLayout::Pages;
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(two_by_two()), &cfg.merge, Some((2, 2)));

    let pages = render_pages(dir.path(), &cells, &cfg, &[1], &merge, |_, _, _| {}).unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_index, 1);
    assert_eq!(pages[0].page_dir, dir.path().join("page_002"));
    assert_eq!(
        pages[0].layer_path("bg").unwrap(),
        dir.path().join("page_002").join("bg.png")
    );
    assert_eq!(image_size(&dir.path().join("page_002/bg.png")), (2, 1));
}

#[test]
fn test_page_number_start_offsets_names() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = split_config(1, 2);
    cfg.output.layout = OutputLayout::Pages;
    cfg.output.page_number_start = 3;
    let image = ImageData::blank(4, 2, [10, 10, 10, 255]);
    let cells = compute_cells(4, 2, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(image), &cfg.merge, Some((4, 2)));

    let pages = render_pages(dir.path(), &cells, &cfg, &[0, 1], &merge, |_, _, _| {}).unwrap();

    assert_eq!(pages[0].page_name, "page_003");
    assert_eq!(pages[1].page_name, "page_004");
    assert_eq!(pages[1].page_number, 4);
    assert!(pages[1].page_dir.ends_with("page_004"));
}

#[test]
fn test_page_number_overflow_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = split_config(1, 2);
    cfg.output.page_number_start = u32::MAX;
    let image = ImageData::blank(4, 2, [10, 10, 10, 255]);
    let cells = compute_cells(4, 2, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(image), &cfg.merge, Some((4, 2)));

    let err = write_plan(dir.path(), (4, 2), &cells, &cfg, &[0, 1], Some(&merge)).unwrap_err();
    assert!(matches!(err, SplitError::Config(_)));

    let err = render_pages(dir.path(), &cells, &cfg, &[1], &merge, |_, _, _| {}).unwrap_err();
    assert!(matches!(err, SplitError::Config(_)));
}

#[test]
fn test_output_dpi_resamples_crops() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = split_config(1, 2);
    cfg.grid.dpi = 300;
    cfg.output.output_dpi = 150;
    let image = ImageData::blank(40, 20, [90, 90, 90, 255]);
    let cells = compute_cells(40, 20, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(image), &cfg.merge, Some((40, 20)));

    let pages = render_pages(dir.path(), &cells, &cfg, &[0], &merge, |_, _, _| {}).unwrap();

    assert_eq!(image_size(pages[0].layer_path("bg").unwrap()), (10, 10));
}

#[test]
fn test_render_reports_each_page() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = split_config(2, 2);
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(two_by_two()), &cfg.merge, Some((2, 2)));

    let mut seen = Vec::new();
    render_pages(dir.path(), &cells, &cfg, &[0, 2, 3], &merge, |page, done, total| {
        seen.push((page.page_index, done, total));
    })
    .unwrap();

    assert_eq!(seen, vec![(0, 1, 3), (2, 2, 3), (3, 3, 3)]);
}

#[test]
fn test_render_requires_a_composite() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = split_config(1, 1);
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();
    let merge = MergeResult::default();

    let err = render_pages(dir.path(), &cells, &cfg, &[0], &merge, |_, _, _| {}).unwrap_err();
    assert!(matches!(err, SplitError::NoComposites));
    assert_eq!(err.to_string(), "No merged images available for rendering");
}

#[test]
fn test_write_plan_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = split_config(1, 2);
    cfg.merge.layer_rules.push(MergeRule::layer("Unused", "x"));
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();
    let merge = apply_merge_rules(&background_layers(two_by_two()), &cfg.merge, Some((2, 2)));

    let plan = write_plan(dir.path(), (2, 2), &cells, &cfg, &[1], Some(&merge)).unwrap();

    assert_eq!(plan.out_dir, dir.path());
    assert!(plan.manifest_path.exists());
    assert_eq!(plan.manifest_path.parent(), Some(dir.path()));

    let document = render::PlanDocument::load(&plan.manifest_path).unwrap();
    assert_eq!((document.source.width, document.source.height), (2, 2));
    assert_eq!(document.grid.rows, 1);
    assert_eq!(document.grid.cols, 2);
    assert_eq!(document.grid.order, GridOrder::LtrTtb);
    assert_eq!(document.output.layer_stack, vec!["bg".to_string()]);
    assert_eq!(document.merge.outputs.get("bg"), Some(&1));
    assert_eq!(document.merge.unmatched, 0);
    assert_eq!(
        document.merge.warnings,
        vec!["merge.layer_rules: no match for Unused".to_string()]
    );
    assert_eq!(document.pages.len(), 1);
    assert_eq!(document.pages[0].page_index, 1);
    assert_eq!(document.pages[0].page_number, 2);
    assert_eq!(document.pages[0].rect, [1, 0, 2, 2]);
    assert_eq!((document.pages[0].row, document.pages[0].col), (0, 1));
}

#[cfg(feature = "toml")]
#[test]
fn test_plan_prefers_toml() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = split_config(1, 1);
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();

    let plan = write_plan(dir.path(), (2, 2), &cells, &cfg, &[0], None).unwrap();
    assert_eq!(plan.manifest_path, dir.path().join("plan.toml"));
}

#[test]
fn test_write_plan_rejects_unknown_page() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = split_config(1, 1);
    let cells = compute_cells(2, 2, &cfg.grid).unwrap();

    let err = write_plan(dir.path(), (2, 2), &cells, &cfg, &[3], None).unwrap_err();
    assert!(matches!(err, SplitError::InvalidArgument(_)));
}
