//! 批量处理集成测试
//!
//! 在临时目录上运行完整流程：样本扫描、阈值化结果复用、掩膜保存、
//! 结果表与运行摘要输出、多条件合并，以及并行与串行结果一致性。


use image_test_fixtures::{HEIGHT, WIDTH, complete_condition, standard_condition, write_sample};
use organoid_coloc_tool::core::ThresholdMode;
use organoid_coloc_tool::imaging::{read_channel_image, write_channel_image};
use organoid_coloc_tool::tools::{self, AppConfig, ConditionJob};
use organoid_coloc_tool::{BitDepth, ChannelImage, ChannelNaming, ErrorCategory};
use std::path::Path;

fn config_for(dirs: &[&Path]) -> AppConfig {
    AppConfig::new(
        dirs.iter().map(|d| d.to_path_buf()).collect(),
        ThresholdMode::Otsu,
    )
}

fn csv_bytes(table: &organoid_coloc_tool::QuantificationTable) -> Vec<u8> {
    let mut buffer = Vec::new();
    table.write_to(&mut buffer).unwrap();
    buffer
}

// ============================================================================
// 单条件处理
// ============================================================================

/// 缺少通道文件的样本被记录为失败，其余样本照常输出
#[test]
fn test_missing_channel_recorded_as_failure() {
    let root = tempfile::tempdir().unwrap();
    let dir = standard_condition(root.path(), "control");
    let config = config_for(&[&dir]);

    let report = tools::process_condition(&dir, &config).unwrap();

    let names: Vec<&str> = report
        .table
        .records()
        .iter()
        .map(|r| r.file_name.as_str())
        .collect();
    assert_eq!(names, vec!["305_1_C1.tif", "305_2_C1.tif"]);
    assert_eq!(report.stats.processed, 2);
    assert_eq!(report.stats.failed, 1);

    let failures = report.table.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].file_name, "306_1_C1.tif");
    assert_eq!(failures[0].category, ErrorCategory::Io);
    assert_eq!(failures[0].condition, "control");

    println!("  ✓ 2个样本成功，1个缺失通道的样本记录为I/O失败");
}

/// 通道尺寸不一致的样本被记录为尺寸失败，不产出记录
#[test]
fn test_shape_mismatch_sample_recorded_as_failure() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("control");
    write_sample(&dir, "305_1", 0, BitDepth::Eight, &[]);
    write_sample(&dir, "305_2", 1, BitDepth::Eight, &[]);
    write_channel_image(
        &dir.join("305_2_C3.tif"),
        &ChannelImage::zeros(5, 5, BitDepth::Eight),
    )
    .unwrap();

    let report = tools::process_condition(&dir, &config_for(&[&dir])).unwrap();

    assert_eq!(report.table.len(), 1);
    assert_eq!(report.table.records()[0].file_name, "305_1_C1.tif");
    assert_eq!(report.stats.failed, 1);

    let failures = report.table.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].file_name, "305_2_C1.tif");
    assert_eq!(failures[0].category, ErrorCategory::Shape);

    println!("  ✓ 尺寸不一致的样本记录为尺寸失败，其余样本照常输出");
}

/// RGB 通道文件不做静默转换，样本记录为格式失败
#[test]
fn test_rgb_sample_recorded_as_format_failure() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("control");
    write_sample(&dir, "305_1", 0, BitDepth::Eight, &[]);
    write_sample(&dir, "305_2", 1, BitDepth::Eight, &[]);
    image::RgbImage::from_pixel(WIDTH, HEIGHT, image::Rgb([1, 2, 3]))
        .save(dir.join("305_2_C2.tif"))
        .unwrap();

    let report = tools::process_condition(&dir, &config_for(&[&dir])).unwrap();

    assert_eq!(report.table.len(), 1);
    let failures = report.table.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].file_name, "305_2_C1.tif");
    assert_eq!(failures[0].category, ErrorCategory::Format);
    assert!(failures[0].message.contains("305_2_C2.tif"));

    println!("  ✓ RGB 通道文件导致格式失败");
}

/// 结果表、运行摘要与派生图像写入 `<条件>_thresholded_<模式>`
#[test]
fn test_outputs_written_next_to_condition() {
    let root = tempfile::tempdir().unwrap();
    let dir = standard_condition(root.path(), "control");
    let config = config_for(&[&dir]);

    let report = tools::process_condition(&dir, &config).unwrap();
    let out = root.path().join("control_thresholded_otsu");
    assert_eq!(report.output_dir, out);
    assert_eq!(report.table_path, out.join("quantification.csv"));
    assert_eq!(report.summary_path, out.join("run_summary.json"));

    let csv = std::fs::read_to_string(&report.table_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("File name,"));
    assert!(lines[1].starts_with("305_1_C1.tif,"));
    assert!(lines[1].ends_with(",False,otsu,control,1,305,"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.summary_path).unwrap()).unwrap();
    assert_eq!(summary["condition"], "control");
    assert_eq!(summary["threshold_mode"], "otsu");
    assert_eq!(summary["records"], 2);
    assert_eq!(summary["failures"].as_array().unwrap().len(), 1);

    assert!(out.join("305_1_C1_gauss_filter_false_otsu_thresholded.tif").is_file());
    assert!(out.join("305_1_C4_gauss_filter_false_otsu_thresholded.tif").is_file());
    assert!(out.join("305_1_C1_gauss_filter_false_otsu_mask_ch1_ch2_ch4.tif").is_file());

    println!("  ✓ CSV、JSON摘要、阈值化图像与掩膜均已生成");
}

/// 保存的掩膜为二值图像，前景值为位深最大值
#[test]
fn test_saved_mask_is_binary() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("deep");
    write_sample(&dir, "401_1", 0, BitDepth::Sixteen, &[]);
    let config = config_for(&[&dir]);

    let report = tools::process_condition(&dir, &config).unwrap();
    assert_eq!(report.table.len(), 1);

    let mask = read_channel_image(
        &report
            .output_dir
            .join("401_1_C1_gauss_filter_false_otsu_mask_ch1_ch2_ch4.tif"),
    )
    .unwrap();
    assert_eq!(mask.depth(), BitDepth::Sixteen);
    assert!(mask.pixels().iter().all(|&v| v == 0 || v == 65535));
    assert_eq!(mask.positive_count(), report.table.records()[0].metrics.mask_count);

    println!("  ✓ 16位掩膜只含 0 / 65535，像素数与掩膜计数一致");
}

/// 关闭保存选项时不生成派生图像
#[test]
fn test_no_image_outputs_when_disabled() {
    let root = tempfile::tempdir().unwrap();
    let dir = complete_condition(root.path(), "control", 1);
    let mut config = config_for(&[&dir]);
    config.save_mask = false;
    config.save_thresholded = false;

    let report = tools::process_condition(&dir, &config).unwrap();
    let tifs = std::fs::read_dir(&report.output_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|x| x == "tif"))
        .count();
    assert_eq!(tifs, 0);
    assert!(report.table_path.is_file());

    println!("  ✓ --no-mask / --no-thresholded 时只输出结果表与摘要");
}

// ============================================================================
// 复用与幂等
// ============================================================================

/// 已有阈值化结果被复用，--force 时重新计算
#[test]
fn test_thresholded_images_reused_unless_forced() {
    let root = tempfile::tempdir().unwrap();
    let dir = complete_condition(root.path(), "control", 1);
    let mut config = config_for(&[&dir]);

    tools::process_condition(&dir, &config).unwrap();

    // 用全零图像替换参考通道的阈值化结果
    let sample = ChannelNaming::default()
        .describe(&dir.join("305_1_C1.tif"))
        .unwrap();
    let job = ConditionJob::new(&dir, &config).unwrap();
    let cached = job.output_naming().thresholded_path(&sample, 2);
    let (w, h) = read_channel_image(&cached).unwrap().dimensions();
    write_channel_image(&cached, &ChannelImage::zeros(w, h, BitDepth::Eight)).unwrap();

    let reused = tools::process_condition(&dir, &config).unwrap();
    let record = &reused.table.records()[0];
    assert_eq!(record.metrics.channel(2).positive_count, 0);
    assert_eq!(record.degenerate_label(), "empty_reference");
    assert_eq!(reused.stats.degenerate, 1);

    config.force = true;
    let forced = tools::process_condition(&dir, &config).unwrap();
    assert!(forced.table.records()[0].metrics.channel(2).positive_count > 0);
    assert!(!forced.table.records()[0].is_degenerate());

    println!("  ✓ 默认复用已有阈值化结果，--force 重新计算");
}

/// 已存在的掩膜文件不会被覆盖
#[test]
fn test_existing_mask_not_overwritten() {
    let root = tempfile::tempdir().unwrap();
    let dir = complete_condition(root.path(), "control", 1);
    let mut config = config_for(&[&dir]);
    config.force = true;

    let first = tools::process_condition(&dir, &config).unwrap();
    let mask_path = first
        .output_dir
        .join("305_1_C1_gauss_filter_false_otsu_mask_ch1_ch2_ch4.tif");
    let (w, h) = read_channel_image(&mask_path).unwrap().dimensions();
    write_channel_image(&mask_path, &ChannelImage::zeros(w, h, BitDepth::Eight)).unwrap();

    let second = tools::process_condition(&dir, &config).unwrap();
    assert_eq!(second.stats.failed, 0);
    assert!(second.table.records()[0].metrics.mask_count > 0);

    let kept = read_channel_image(&mask_path).unwrap();
    assert_eq!(kept.positive_count(), 0);

    println!("  ✓ 重复运行时已有掩膜保持不变");
}

// ============================================================================
// 并行与多条件
// ============================================================================

/// 并行处理的结果表与串行逐字节一致
#[test]
fn test_parallel_matches_serial() {
    let serial_root = tempfile::tempdir().unwrap();
    let parallel_root = tempfile::tempdir().unwrap();
    let serial_dir = standard_condition(serial_root.path(), "control");
    let parallel_dir = standard_condition(parallel_root.path(), "control");

    let serial = tools::process_condition(&serial_dir, &config_for(&[&serial_dir])).unwrap();

    let mut config = config_for(&[&parallel_dir]);
    config.parallel_files = Some(3);
    let parallel = tools::process_condition(&parallel_dir, &config).unwrap();

    assert_eq!(csv_bytes(&serial.table), csv_bytes(&parallel.table));
    assert_eq!(parallel.stats.processed, serial.stats.processed);
    assert_eq!(parallel.stats.failed, serial.stats.failed);
    assert_eq!(
        parallel.table.failures()[0].file_name,
        serial.table.failures()[0].file_name
    );

    println!("  ✓ 并行结果与串行一致（含顺序）");
}

/// 并行与串行运行的摘要统计与失败列表一致
#[test]
fn test_parallel_summary_matches_serial() {
    fn summary(report: &tools::ConditionReport) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(&report.summary_path).unwrap()).unwrap()
    }

    let serial_root = tempfile::tempdir().unwrap();
    let parallel_root = tempfile::tempdir().unwrap();
    let serial_dir = standard_condition(serial_root.path(), "control");
    let parallel_dir = standard_condition(parallel_root.path(), "control");
    for dir in [&serial_dir, &parallel_dir] {
        write_sample(dir, "307_1", 3, BitDepth::Eight, &[1]);
    }

    let serial = tools::process_condition(&serial_dir, &config_for(&[&serial_dir])).unwrap();
    let mut config = config_for(&[&parallel_dir]);
    config.parallel_files = Some(4);
    let parallel = tools::process_condition(&parallel_dir, &config).unwrap();

    // 失败消息含临时目录路径，只比较文件名与类别
    fn failure_keys(summary: &serde_json::Value) -> Vec<(String, String)> {
        summary["failures"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| (f["file_name"].to_string(), f["category"].to_string()))
            .collect()
    }

    assert_eq!(serial.stats, parallel.stats);
    let (s, p) = (summary(&serial), summary(&parallel));
    assert_eq!(s["stats"], p["stats"]);
    assert_eq!(s["stats"]["failed"], 2);
    assert_eq!(failure_keys(&s), failure_keys(&p));

    let names: Vec<String> = failure_keys(&p).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["\"306_1_C1.tif\"", "\"307_1_C1.tif\""]);

    println!("  ✓ 并行摘要的统计与失败顺序与串行一致");
}

/// 多条件运行生成合并结果表
#[test]
fn test_multi_condition_combined_table() {
    let root = tempfile::tempdir().unwrap();
    let control = complete_condition(root.path(), "control", 2);
    let treated = complete_condition(root.path(), "treated", 3);
    let config = config_for(&[&control, &treated]);

    let run = tools::run(&config).unwrap();
    assert_eq!(run.conditions.len(), 2);

    let combined = root
        .path()
        .join("comparison_results")
        .join("otsu")
        .join("quantification_all.csv");
    assert_eq!(run.combined_path.as_deref(), Some(combined.as_path()));

    let mut reader = csv::Reader::from_path(&combined).unwrap();
    let condition_idx = reader
        .headers()
        .unwrap()
        .iter()
        .position(|h| h == "Condition")
        .unwrap();
    let conditions: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[condition_idx].to_string())
        .collect();
    assert_eq!(
        conditions,
        vec!["control", "control", "treated", "treated", "treated"]
    );

    println!("  ✓ 合并结果表按条件顺序包含全部5条记录");
}

/// 单条件运行不生成合并结果表
#[test]
fn test_single_condition_has_no_combined_table() {
    let root = tempfile::tempdir().unwrap();
    let dir = complete_condition(root.path(), "control", 1);

    let run = tools::run(&config_for(&[&dir])).unwrap();
    assert!(run.combined_path.is_none());
    assert!(!root.path().join("comparison_results").exists());

    println!("  ✓ 单条件不生成 comparison_results");
}

/// 条件目录不存在时整个运行失败
#[test]
fn test_missing_condition_dir_fails_run() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("nope");
    assert!(tools::run(&config_for(&[&missing])).is_err());
    println!("  ✓ 条件目录不存在时返回错误");
}
