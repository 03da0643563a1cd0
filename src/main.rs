use anyhow::{bail, Context};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vfx_text_editor::datatypes::parse_vec3;
use vfx_text_editor::io::{
    BinConverter, DefaultTextReader, DefaultTextWriter, ExternalConverter, TextReader,
};
use vfx_text_editor::{
    parse_with_report, DocumentGraph, EditorConfig, EmitterKey, ParseReport, PropertyKind, Vec3,
    VfxEditor, SUPPORTED_EXTENSIONS,
};

#[derive(Parser)]
#[command(name = "vfx_text_editor")]
#[command(about = "解析并按需修改 VFX 定义的文本转储")]
#[command(version)]
struct Cli {
    /// 输入文本转储路径（可以有多个，编辑模式只接受一个）
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// 输出文本路径（默认覆盖输入文件）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 显示文档统计信息
    #[arg(long)]
    stats: bool,

    /// 列出所有系统和发射器
    #[arg(long)]
    list: bool,

    /// 把对象图导出为 JSON 文件
    #[arg(long)]
    dump_json: Option<PathBuf>,

    /// 按倍数缩放 --property 指定的属性
    #[arg(long)]
    scale: Option<f32>,

    /// --scale 作用的属性（默认 birthScale0 和 scale0）
    #[arg(long = "property")]
    properties: Vec<PropertyKind>,

    /// 设置 bindWeight 常量（缺失时添加）
    #[arg(long)]
    set_bind_weight: Option<f32>,

    /// 设置 translationOverride，格式 x,y,z（缺失时添加）
    #[arg(long, value_parser = parse_vec3_arg)]
    set_translation: Option<Vec3>,

    /// 只编辑这些系统（完整名称或显示名称）
    #[arg(long = "system")]
    systems: Vec<String>,

    /// 只编辑这些名称的发射器
    #[arg(long = "emitter")]
    emitters: Vec<String>,

    /// 隔离模式：只写回这一种属性
    #[arg(long)]
    isolate: Option<PropertyKind>,

    /// 覆盖文件前创建备份
    #[arg(long)]
    backup: bool,

    /// 外部转换器可执行文件，保存后用它把文本转回二进制
    #[arg(long)]
    converter: Option<PathBuf>,

    /// 二进制输出路径（默认为输出文本路径改扩展名为 .bin）
    #[arg(long)]
    bin_output: Option<PathBuf>,

    /// 静默模式(仅输出错误)
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn has_edits(&self) -> bool {
        self.scale.is_some() || self.set_bind_weight.is_some() || self.set_translation.is_some()
    }
}

fn parse_vec3_arg(value: &str) -> Result<Vec3, String> {
    parse_vec3(value).ok_or_else(|| format!("无效的向量: {value}（格式 x,y,z）"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    for input in &cli.input {
        validate_input(input)?;
    }

    let config = match &cli.config {
        Some(path) => EditorConfig::from_json_file(path)
            .with_context(|| format!("读取配置失败: {}", path.display()))?,
        None => EditorConfig::default(),
    };

    if cli.has_edits() {
        return handle_edit(&cli, config);
    }

    handle_inspect(&cli, &config)
}

fn init_tracing(quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 验证输入文件
fn validate_input(input: &Path) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("输入文件不存在: {}", input.display());
    }

    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    if !SUPPORTED_EXTENSIONS.iter().any(|&ext| Some(ext) == extension.as_deref()) {
        bail!(
            "不支持的文件类型: {}（支持: {}）",
            input.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        );
    }

    Ok(())
}

/// 只读模式：统计、列表、JSON 导出
fn handle_inspect(cli: &Cli, config: &EditorConfig) -> anyhow::Result<()> {
    let reader = DefaultTextReader::default();

    // 各文档互相独立，并行解析
    let reports: Vec<(PathBuf, anyhow::Result<ParseReport>)> = cli
        .input
        .par_iter()
        .map(|path| {
            let report = reader
                .read(path)
                .map(|data| parse_with_report(&data.lines, config))
                .with_context(|| format!("读取失败: {}", path.display()));
            (path.clone(), report)
        })
        .collect();

    let mut graphs = Vec::new();
    for (path, report) in reports {
        let report = report?;
        if !cli.quiet {
            println!("== {} ==", path.display());
            if !report.anomalies.is_empty() {
                println!("解析异常: {} 处", report.anomalies.len());
            }
            if cli.stats || !cli.list {
                println!("{}", report.graph.stats());
            }
            if cli.list {
                print_listing(&report.graph);
            }
        }
        graphs.push(report.graph);
    }

    if let Some(json_path) = &cli.dump_json {
        let json = if graphs.len() == 1 {
            graphs[0].to_json()?
        } else {
            serde_json::to_string_pretty(&graphs)?
        };
        std::fs::write(json_path, json)
            .with_context(|| format!("写入 JSON 失败: {}", json_path.display()))?;
        if !cli.quiet {
            println!("对象图已导出到: {}", json_path.display());
        }
    }

    Ok(())
}

fn print_listing(graph: &DocumentGraph) {
    for system in graph.systems() {
        println!("{} (行 {})", system.full_name, system.anchor_line + 1);
        for emitter in &system.emitters {
            let props: Vec<&str> = PropertyKind::ALL
                .iter()
                .filter(|kind| emitter.properties.contains(**kind))
                .map(|kind| kind.field_name())
                .collect();
            println!(
                "    {} (行 {}) [{}]",
                if emitter.name.is_empty() { "<未命名>" } else { emitter.name.as_str() },
                emitter.anchor_line + 1,
                props.join(", ")
            );
        }
    }
}

/// 按过滤条件选出发射器
fn matching_keys(cli: &Cli, graph: &DocumentGraph) -> Vec<EmitterKey> {
    graph
        .systems()
        .iter()
        .filter(|s| {
            cli.systems.is_empty()
                || cli.systems.iter().any(|name| *name == s.full_name || *name == s.name)
        })
        .flat_map(|s| s.emitters.iter())
        .filter(|e| cli.emitters.is_empty() || cli.emitters.contains(&e.name))
        .map(|e| e.key())
        .collect()
}

/// 编辑模式
fn handle_edit(cli: &Cli, config: EditorConfig) -> anyhow::Result<()> {
    let [input] = cli.input.as_slice() else {
        bail!("编辑模式只支持单个输入文件");
    };

    let reader = DefaultTextReader::default();
    let mut editor = VfxEditor::open(&reader, input, config)
        .with_context(|| format!("读取失败: {}", input.display()))?;

    let keys = matching_keys(cli, editor.graph());
    if keys.is_empty() {
        bail!("没有匹配的发射器");
    }
    for key in &keys {
        editor.select(key)?;
    }
    editor.set_isolated(cli.isolate);

    let mut edited = 0;
    if let Some(multiplier) = cli.scale {
        let kinds = if cli.properties.is_empty() {
            vec![PropertyKind::BirthScale, PropertyKind::Scale]
        } else {
            cli.properties.clone()
        };
        for kind in kinds {
            edited += editor.scale_selected(kind, multiplier);
        }
    }
    if let Some(value) = cli.set_bind_weight {
        edited += editor.set_bind_weight_selected(value);
    }
    if let Some(value) = cli.set_translation {
        edited += editor.set_translation_selected(value);
    }

    let report = editor.apply();

    if !cli.quiet {
        println!("选中发射器: {}", keys.len());
        println!("修改属性: {}", edited);
        println!("改写行: {}", report.updated_lines.len());
        println!(
            "插入块: {}（共 {} 行）",
            report.insertions.len(),
            report.inserted_line_count()
        );
        for anomaly in &report.anomalies {
            println!("跳过: {}", anomaly);
        }
    }

    let output = cli.output.clone().unwrap_or_else(|| input.clone());
    let writer = DefaultTextWriter { backup: cli.backup };
    editor
        .save(&writer, &output)
        .with_context(|| format!("写入失败: {}", output.display()))?;

    if !cli.quiet {
        println!("已保存到: {}", output.display());
    }

    if let Some(program) = &cli.converter {
        let bin = cli
            .bin_output
            .clone()
            .unwrap_or_else(|| output.with_extension("bin"));
        ExternalConverter::new(program)
            .text_to_bin(&output, &bin)
            .context("转换为二进制失败")?;
        if !cli.quiet {
            println!("二进制已输出到: {}", bin.display());
        }
    }

    Ok(())
}
