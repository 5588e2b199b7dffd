//! Runfolder fixtures shared by the integration tests.
//!
//! Each builder lays out the smallest directory tree a real pipeline
//! would have left behind for that generation of instrument.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const GA_RUNFOLDER: &str = "080416_HWI-EAS229_0024_207BTAAXX";
pub const GA_FIRECREST: &str = "C1-33_Firecrest1.9.6_20-10-2008_diane";
pub const GA_BUSTARD: &str = "Bustard1.9.6_20-10-2008_diane";
pub const GA_GERALD: &str = "GERALD_20-10-2008_diane";

pub const HISEQ_RUNFOLDER: &str = "110815_SN787_0101_AD07K6ACXX";

pub const MATRIX: &str = "# Auto-generated frequency response matrix
> A
> C
> G
> T
0.77 0.15 -0.04 0.04
0.76 1.02 -0.05 0.06
-0.10 -0.10 1.17 -0.03
-0.13 -0.12 0.80 1.27
";

pub const GERALD_CONFIG: &str = r#"<RunParameters>
<ChipWideRunParameters>
  <ANALYSIS>default</ANALYSIS>
  <ELAND_GENOME>Need_to_specify_ELAND_genome_directory</ELAND_GENOME>
  <EXPT_DIR>/home/diane/gec/080416_HWI-EAS229_0024_207BTAAXX/Data/C1-33_Firecrest1.9.6_20-10-2008_diane/Bustard1.9.6_20-10-2008_diane</EXPT_DIR>
  <EXPT_DIR_ROOT>/home/diane/gec</EXPT_DIR_ROOT>
  <READ_LENGTH>32</READ_LENGTH>
  <SOFTWARE_VERSION>@(#) Id: GERALD.pl,v 1.171 2008/05/19 17:36:14 mzerara Exp</SOFTWARE_VERSION>
  <TIME_STAMP>Sat Apr 19 19:08:30 2008</TIME_STAMP>
</ChipWideRunParameters>
<LaneSpecificRunParameters>
  <ANALYSIS>
    <s_1>eland</s_1><s_2>eland</s_2><s_3>eland</s_3><s_4>eland</s_4>
    <s_5>eland</s_5><s_6>eland</s_6><s_7>eland</s_7><s_8>eland</s_8>
  </ANALYSIS>
  <ELAND_GENOME>
    <s_1>{genome}</s_1><s_2>{genome}</s_2><s_3>{genome}</s_3><s_4>{genome}</s_4>
    <s_5>{genome}</s_5><s_6>{genome}</s_6><s_7>{genome}</s_7><s_8>{genome}</s_8>
  </ELAND_GENOME>
  <USE_BASES>
    <s_1>YYYY</s_1><s_2>YYYY</s_2><s_3>YYYY</s_3><s_4>YYYY</s_4>
    <s_5>YYYY</s_5><s_6>YYYY</s_6><s_7>YYYY</s_7><s_8>YYYY</s_8>
  </USE_BASES>
</LaneSpecificRunParameters>
</RunParameters>
"#;

pub const CASAVA_CONFIG: &str = r#"<RunParameters>
  <ChipWideRunParameters>
    <ELAND_GENOME>{genome}</ELAND_GENOME>
  </ChipWideRunParameters>
  <Defaults>
    <EXPT_DIR>/data/runs/110815_SN787_0101_AD07K6ACXX/Unaligned</EXPT_DIR>
  </Defaults>
  <Projects>
    <Project name="1">
      <ANALYSIS>eland_extended</ANALYSIS>
      <READ_LENGTH1>100</READ_LENGTH1>
      <USE_BASES1>Y100</USE_BASES1>
    </Project>
    <Project name="2">
      <ANALYSIS>eland_extended</ANALYSIS>
      <READ_LENGTH1>100</READ_LENGTH1>
      <USE_BASES1>Y100</USE_BASES1>
    </Project>
  </Projects>
  <Software Name="CASAVA" Version="CASAVA-1.8.2"/>
</RunParameters>
"#;

pub const DEMULTIPLEXED_CONFIG: &str = r#"<?xml version="1.0"?>
<BaseCallAnalysis>
  <Run Name="BaseCalls">
    <Software Name="RTA" Version="1.12.4.2"/>
  </Run>
</BaseCallAnalysis>
"#;

pub const RTA_CONFIG: &str = r#"<?xml version="1.0"?>
<ImageAnalysis>
  <Run Name="Intensities">
    <Software Name="RTA" Version="1.12.4.2" />
    <Cycles First="1" Last="101" Number="101" />
    <RunParameters>
      <RunFolder>110815_SN787_0101_AD07K6ACXX</RunFolder>
    </RunParameters>
  </Run>
</ImageAnalysis>
"#;

pub const IPAR_PARAMS: &str = r#"<?xml version="1.0"?>
<ImageAnalysis>
  <Run Name="IPAR_1.01">
    <Software Name="IPAR" Version="2.01.192.0" />
    <Cycles First="1" Last="37" Number="37" />
    <RunParameters>
      <Compression>gzip</Compression>
      <CompressionSuffix>.p.gz</CompressionSuffix>
      <Instrument>HWI-EAS229</Instrument>
      <RunFolder>081021_HWI-EAS229_0063_30HKUAAXX</RunFolder>
    </RunParameters>
    <TileSelection>
      <Lane Index="1">
        <Sample>s</Sample>
        <TileRange Max="3" Min="1" />
      </Lane>
    </TileSelection>
  </Run>
</ImageAnalysis>
"#;

/// Four reads: one exact hit on `chrUextra.fa`, two one-mismatch hits and
/// one read with no match
pub const ELAND_RESULT: &str = "\
>HWI-EAS229_24_207BTAAXX:1:7:599:759\tACATAGNCACAGACATAAACATAGACATAGAC\tU0\t1\t1\t3\tchrUextra.fa\t28189829\tR\tD.
>HWI-EAS229_24_207BTAAXX:1:7:205:842\tAAACAANNCTCCCAAACACGTAAACTGGAAAA\tU1\t0\t1\t0\tchr2L.fa\t8796855\tR\tDD\t24T
>HWI-EAS229_24_207BTAAXX:1:7:776:582\tAGCTCANCCGATCGAAAACCTCNCCAAGCAAT\tNM\t0\t0\t0
>HWI-EAS229_24_207BTAAXX:1:7:205:842\tAAACAANNCTCCCAAACACGTAAACTGGAAAA\tU1\t0\t1\t0\tLambda.fa\t8796855\tR\tDD\t24T
";

/// Three export reads: a QC failure, an exact hit and a two-mismatch hit
pub const EXPORT: &str = "\
ILLUMINA-33A494\t1\t1\t1\t3291\t1036\t0\t1\tGANNTCCTCACCCGACANNNNNNNANNNCGGGNNACTC\tXBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB\tQC
ILLUMINA-33A494\t1\t1\t1\t2678\t1045\t0\t1\tAAGGTGAAGAAGGAGATGNNGATGATGACGACGATAGA\tWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWW\tchrX.fa\t148341829\tF\t38\t45
ILLUMINA-33A494\t1\t1\t1\t2678\t1045\t0\t1\tAAGGTGAAGAAGGAGATGNNGATGATGACGACGATAGA\tWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWW\tchrX.fa\t148341829\tF\t18AA15G1T\t45
";

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(path, contents).expect("Failed to write fixture file");
}

fn html_row(lane: u32) -> String {
    format!(
        "<tr><td>{lane}</td><td>{yield_}</td><td>{c} +/- 4000</td><td>{pf} +/- 2100</td>\
         <td>190 +/- 15</td><td>38.99 +/- 3.37</td><td>33.72 +/- 4.80</td>\
         <td>unknown</td><td>+/-</td><td>0.51 +/- 0.12</td></tr>\n",
        yield_ = 1_133_000 + lane,
        c = 126_000 + lane,
        pf = 60_000 + lane
    )
}

/// A ten-column `Summary.htm` with one lane table per name
pub fn summary_htm(tables: &[&str]) -> String {
    let mut doc = String::from("<html><body><h1>Summary Information</h1>\n");
    for name in tables {
        doc.push_str(&format!("<h2>{name}</h2>\n<table border=\"1\">\n"));
        doc.push_str("<tr><td colSpan=\"2\">Lane Info</td><td colSpan=\"8\">Tile Mean +/- SD for Lane</td></tr>\n");
        doc.push_str("<tr><td>Lane</td><td>Lane Yield</td><td>Clusters (raw)</td><td>Clusters (PF)</td><td>1st Cycle Int</td><td>% intensity after 20 cycles</td><td>% PF Clusters</td><td>% Align (PF)</td><td>Alignment Score</td><td>% Error Rate</td></tr>\n");
        for lane in 1..=8 {
            doc.push_str(&html_row(lane));
        }
        doc.push_str("<tr><td>Avg</td><td>0</td><td>1 +/- 1</td><td>1 +/- 1</td><td>1 +/- 1</td><td>1 +/- 1</td><td>1 +/- 1</td><td>1 +/- 1</td><td>1 +/- 1</td><td>1 +/- 1</td></tr>\n");
        doc.push_str("</table>\n");
    }
    doc.push_str("</body></html>\n");
    doc
}

/// An ELAND genome directory: `chr2L.fa` belongs to the genome and
/// `Lambda.fa` is a linked spike-in.
pub fn make_genome(root: &Path) -> PathBuf {
    let genome = root.join("dm3");
    fs::create_dir_all(&genome).expect("Failed to create genome directory");
    for name in ["chr2L.fa.vld", "chrUextra.fa.vld"] {
        write(&genome.join(name), "");
    }
    let spike = root.join("Lambda.fa.vld");
    write(&spike, "");
    #[cfg(unix)]
    std::os::unix::fs::symlink(&spike, genome.join("Lambda.fa.vld"))
        .expect("Failed to link spike-in index");
    genome
}

/// A GA runfolder: Firecrest image analysis, a legacy Bustard directory and
/// one GERALD directory with a ten-column `Summary.htm` and an
/// `eland_result` file per lane. Returns the runfolder path.
pub fn make_ga_runfolder(root: &Path, genome: Option<&Path>) -> PathBuf {
    let runfolder = root.join(GA_RUNFOLDER);
    let firecrest = runfolder.join("Data").join(GA_FIRECREST);
    write(&firecrest.join("Matrix").join("s_matrix.txt"), MATRIX);

    let bustard = firecrest.join(GA_BUSTARD);
    write(&bustard.join("matrix1.txt"), MATRIX);

    let gerald = bustard.join(GA_GERALD);
    let genome = genome.map_or_else(|| "/nonexistent/dm3".to_string(), |g| g.display().to_string());
    write(&gerald.join("config.xml"), &GERALD_CONFIG.replace("{genome}", &genome));
    write(&gerald.join("Summary.htm"), &summary_htm(&["Lane Results Summary"]));
    for lane in 1..=8 {
        write(&gerald.join(format!("s_{lane}_eland_result.txt")), ELAND_RESULT);
    }
    runfolder
}

/// Path of the GERALD directory inside [`make_ga_runfolder`]'s runfolder
pub fn ga_gerald_dir(runfolder: &Path) -> PathBuf {
    runfolder
        .join("Data")
        .join(GA_FIRECREST)
        .join(GA_BUSTARD)
        .join(GA_GERALD)
}

/// A GA runfolder imaged by IPAR with one GERALD run under `Bustard`.
pub fn make_ipar_runfolder(root: &Path) -> PathBuf {
    let runfolder = root.join("081021_HWI-EAS229_0063_30HKUAAXX");
    let data = runfolder.join("Data");
    write(&data.join(".params"), IPAR_PARAMS);

    let bustard = data.join("IPAR_1.01").join("Bustard1.9.6_21-10-2008_diane");
    fs::create_dir_all(&bustard).expect("Failed to create bustard directory");
    let gerald = bustard.join("GERALD_21-10-2008_diane");
    write(&gerald.join("config.xml"), &GERALD_CONFIG.replace("{genome}", "/nonexistent/dm3"));
    write(&gerald.join("s_1_eland_result.txt"), ELAND_RESULT);
    runfolder
}

/// A HiSeq runfolder with `Aligned`/`Unaligned` and
/// `Aligned_6mm`/`Unaligned_6mm` pairs. Demultiplexed export files live
/// under `Project_*/Sample_*`.
pub fn make_hiseq_runfolder(root: &Path) -> PathBuf {
    let runfolder = root.join(HISEQ_RUNFOLDER);
    write(
        &runfolder.join("Data").join("Intensities").join("RTAConfig.xml"),
        RTA_CONFIG,
    );
    for suffix in ["", "_6mm"] {
        write(
            &runfolder
                .join(format!("Unaligned{suffix}"))
                .join("DemultiplexedBustardConfig.xml"),
            DEMULTIPLEXED_CONFIG,
        );
        let aligned = runfolder.join(format!("Aligned{suffix}"));
        write(
            &aligned.join("config.xml"),
            &CASAVA_CONFIG.replace("{genome}", "/nonexistent/hg19"),
        );
        let sample = aligned.join("Project_12345").join("Sample_12345");
        write(&sample.join("12345_NoIndex_L001_R1_001_export.txt"), EXPORT);
        write(&sample.join("12345_NoIndex_L001_R1_002_export.txt"), EXPORT);
        write(&sample.join("12345_NoIndex_L002_R1_001_export.txt"), EXPORT);
    }
    runfolder
}
