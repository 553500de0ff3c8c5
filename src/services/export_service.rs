use crate::dto::attempt_dto::{AttemptReport, ExamResultRow};
use crate::error::Result;
use crate::models::exam::Exam;
use crate::services::grading_service::{Grade, GradingService};
use rust_xlsxwriter::*;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct ExportService;

struct Palette {
    title_bg: Color,
    header_bg: Color,
    border: Color,
    alt_row: Color,
    correct: Color,
    wrong: Color,
}

const PALETTE: Palette = Palette {
    title_bg: Color::RGB(0x1E293B),
    header_bg: Color::RGB(0x0F172A),
    border: Color::RGB(0xE2E8F0),
    alt_row: Color::RGB(0xF8FAFC),
    correct: Color::RGB(0x10B981),
    wrong: Color::RGB(0xEF4444),
};

impl ExportService {
    fn title_format() -> Format {
        Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(PALETTE.title_bg)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter)
    }

    fn header_format() -> Format {
        Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(Color::White)
            .set_background_color(PALETTE.header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(PALETTE.border)
    }

    fn cell_format(striped: bool) -> Format {
        let bg = if striped { PALETTE.alt_row } else { Color::White };
        Format::new()
            .set_font_size(10)
            .set_background_color(bg)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(PALETTE.border)
    }

    fn grade_color(grade: Grade) -> Color {
        match grade {
            Grade::A | Grade::B => PALETTE.correct,
            Grade::C | Grade::D => Color::RGB(0xF59E0B),
            Grade::E => PALETTE.wrong,
            Grade::NotApplicable => Color::RGB(0x64748B),
        }
    }

    /// One sheet describing a single attempt. Each option row carries `V`
    /// when it is the correct option and `X` when the student picked it.
    pub fn attempt_report_xlsx(report: &AttemptReport) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Result")?;

        let columns = [("Question", 50.0), ("Option", 45.0), ("Correct", 10.0), ("Picked", 10.0)];
        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }
        let last_col = (columns.len() - 1) as u16;

        worksheet.set_row_height(0, 36)?;
        worksheet.merge_range(
            0,
            0,
            0,
            last_col,
            &format!("Exam result: {}", report.exam_title),
            &Self::title_format(),
        )?;

        let label_fmt = Format::new().set_bold().set_font_size(10);
        let value_fmt = Format::new().set_font_size(10);
        let summary = [
            ("Student", report.student_name.clone()),
            ("Attempt", report.attempt_number.to_string()),
            ("Score", format!("{}/{}", report.score, report.total)),
            ("Percentage", format!("{:.1}%", report.percentage)),
            (
                "Submitted",
                report.submitted_at.format("%d.%m.%Y %H:%M UTC").to_string(),
            ),
        ];
        for (i, (label, value)) in summary.iter().enumerate() {
            let row = 1 + i as u32;
            worksheet.write_string_with_format(row, 0, *label, &label_fmt)?;
            worksheet.write_string_with_format(row, 1, value, &value_fmt)?;
        }

        let grade_row = 1 + summary.len() as u32;
        let grade_fmt = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Self::grade_color(report.grade))
            .set_align(FormatAlign::Center);
        worksheet.write_string_with_format(grade_row, 0, "Grade", &label_fmt)?;
        worksheet.write_string_with_format(grade_row, 1, report.grade.as_str(), &grade_fmt)?;

        let header_row = grade_row + 2;
        let header_fmt = Self::header_format();
        worksheet.set_row_height(header_row, 24)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_fmt)?;
        }

        let mut row = header_row + 1;
        for (idx, question) in report.questions.iter().enumerate() {
            let base_fmt = Self::cell_format(idx % 2 == 0);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let question_fmt = base_fmt.clone().set_bold().set_text_wrap();
            let mark_fmt = center_fmt.clone().set_bold().set_font_color(if question.is_correct {
                PALETTE.correct
            } else {
                PALETTE.wrong
            });

            let question_text = format!("{}. {}", idx + 1, question.text);
            if question.options.is_empty() {
                worksheet.write_string_with_format(row, 0, &question_text, &question_fmt)?;
                row += 1;
                continue;
            }

            for (o_idx, option) in question.options.iter().enumerate() {
                let text = if o_idx == 0 { question_text.as_str() } else { "" };
                worksheet.write_string_with_format(row, 0, text, &question_fmt)?;
                worksheet.write_string_with_format(row, 1, &option.text, &base_fmt)?;
                worksheet.write_string_with_format(
                    row,
                    2,
                    if option.is_correct { "V" } else { "" },
                    &center_fmt,
                )?;
                worksheet.write_string_with_format(
                    row,
                    3,
                    if option.selected { "X" } else { "" },
                    &mark_fmt,
                )?;
                row += 1;
            }
        }

        worksheet.set_freeze_panes(header_row + 1, 0)?;
        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }

    /// Every recorded attempt at one exam, oldest first.
    pub fn exam_results_xlsx(exam: &Exam, rows: &[ExamResultRow]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Results")?;

        let columns = [
            ("#", 6.0),
            ("Student", 28.0),
            ("Attempt", 10.0),
            ("Score", 10.0),
            ("Total", 10.0),
            ("Percentage", 12.0),
            ("Grade", 10.0),
            ("Submitted", 22.0),
        ];
        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }
        let last_col = (columns.len() - 1) as u16;

        worksheet.set_row_height(0, 36)?;
        worksheet.merge_range(
            0,
            0,
            0,
            last_col,
            &format!("Results: {}", exam.title),
            &Self::title_format(),
        )?;

        let header_row = 1;
        let header_fmt = Self::header_format();
        worksheet.set_row_height(header_row, 24)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_fmt)?;
        }

        for (idx, result) in rows.iter().enumerate() {
            let row = header_row + 1 + idx as u32;
            let base_fmt = Self::cell_format(idx % 2 == 0);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let percent_fmt = center_fmt.clone().set_num_format("0.0");
            let grade = GradingService::grade(result.score, result.total);
            let grade_fmt = center_fmt
                .clone()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Self::grade_color(grade));

            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 1, &result.student_name, &base_fmt)?;
            worksheet.write_number_with_format(row, 2, result.attempt_number as f64, &center_fmt)?;
            worksheet.write_number_with_format(row, 3, result.score as f64, &center_fmt)?;
            worksheet.write_number_with_format(row, 4, result.total as f64, &center_fmt)?;
            worksheet.write_number_with_format(
                row,
                5,
                GradingService::percentage(result.score, result.total),
                &percent_fmt,
            )?;
            worksheet.write_string_with_format(row, 6, grade.as_str(), &grade_fmt)?;
            worksheet.write_string_with_format(
                row,
                7,
                &result.submitted_at.format("%d.%m.%Y %H:%M").to_string(),
                &center_fmt,
            )?;
        }

        worksheet.set_freeze_panes(header_row + 1, 0)?;
        if !rows.is_empty() {
            worksheet.autofilter(header_row, 0, header_row + rows.len() as u32, last_col)?;
        }

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}
