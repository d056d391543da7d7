// src/ui/lcd.rs - 20x4 character LCD on top of an HD44780-style driver
use super::Display;

pub const LCD_ROWS: usize = 4;
pub const LCD_COLS: usize = 20;

const VISIBLE_MENU_ITEMS: usize = 3;
const BAR_LENGTH: usize = LCD_COLS - 6;

// HD44780 instruction set
const CMD_CLEAR: u8 = 0x01;
const CMD_HOME: u8 = 0x02;
const CMD_ENTRY_MODE: u8 = 0x04;
const CMD_DISPLAY_CTRL: u8 = 0x08;
const CMD_FUNCTION_SET: u8 = 0x20;
const CMD_SET_DDRAM: u8 = 0x80;

const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const FUNCTION_2LINE: u8 = 0x08;

/// Byte-level access to a character display controller.
pub trait DisplayDriver: Send {
    fn write_command(&mut self, cmd: u8);
    fn write_data(&mut self, byte: u8);
    fn backlight_on(&mut self);
    fn backlight_off(&mut self);

    /// Called once a full screen has been drawn.
    fn present(&mut self) {}
}

/// [`Display`] for any 20x4 character controller. Keeps a shadow buffer of
/// what is on the glass.
pub struct CharacterLcd<D: DisplayDriver> {
    driver: D,
    buffer: [[u8; LCD_COLS]; LCD_ROWS],
}

impl<D: DisplayDriver> CharacterLcd<D> {
    pub fn new(mut driver: D) -> Self {
        driver.write_command(CMD_FUNCTION_SET | FUNCTION_2LINE);
        driver.write_command(CMD_DISPLAY_CTRL | DISPLAY_ON);
        driver.write_command(CMD_ENTRY_MODE | ENTRY_LEFT);
        driver.write_command(CMD_CLEAR);
        driver.backlight_on();
        Self { driver, buffer: [[b' '; LCD_COLS]; LCD_ROWS] }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn set_backlight(&mut self, on: bool) {
        if on {
            self.driver.backlight_on();
        } else {
            self.driver.backlight_off();
        }
    }

    /// Current contents, one string per row, trailing spaces kept.
    pub fn lines(&self) -> Vec<String> {
        self.buffer.iter().map(|row| String::from_utf8_lossy(row).into_owned()).collect()
    }

    fn move_to(&mut self, col: usize, row: usize) {
        let mut addr = (col & 0x3f) as u8;
        if row & 1 != 0 {
            addr += 0x40;
        }
        if row & 2 != 0 {
            addr += LCD_COLS as u8;
        }
        self.driver.write_command(CMD_SET_DDRAM | addr);
    }

    /// Write `text` at `col`, blanking the rest of the row. Out-of-range rows
    /// are ignored; text is clipped to the screen width.
    pub fn write_line(&mut self, row: usize, text: &str, col: usize) {
        if row >= LCD_ROWS || col >= LCD_COLS {
            return;
        }
        self.move_to(col, row);
        for c in col..LCD_COLS {
            self.driver.write_data(b' ');
            self.buffer[row][c] = b' ';
        }
        self.move_to(col, row);
        for (offset, byte) in text.chars().map(lcd_byte).take(LCD_COLS - col).enumerate() {
            self.driver.write_data(byte);
            self.buffer[row][col + offset] = byte;
        }
    }

    pub fn write_center(&mut self, row: usize, text: &str) {
        let len = text.chars().count().min(LCD_COLS);
        self.write_line(row, text, (LCD_COLS - len) / 2);
    }

    fn present(&mut self) {
        self.driver.present();
    }
}

/// Map to the controller's ASCII character ROM.
fn lcd_byte(c: char) -> u8 {
    if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' }
}

impl<D: DisplayDriver> Display for CharacterLcd<D> {
    fn clear(&mut self) {
        self.driver.write_command(CMD_CLEAR);
        self.driver.write_command(CMD_HOME);
        self.buffer = [[b' '; LCD_COLS]; LCD_ROWS];
    }

    fn render_menu(&mut self, title: &str, items: &[String], selected: usize) {
        self.clear();
        self.write_center(0, title);

        let start = (selected + 1).saturating_sub(VISIBLE_MENU_ITEMS);
        for (row, (index, item)) in items.iter().enumerate().skip(start).take(VISIBLE_MENU_ITEMS).enumerate() {
            let marker = if index == selected { '>' } else { ' ' };
            self.write_line(row + 1, &format!("{} {}", marker, item), 0);
        }
        self.present();
    }

    fn render_status(&mut self, lines: &[String]) {
        self.clear();
        for (row, line) in lines.iter().take(LCD_ROWS).enumerate() {
            if row == 0 {
                self.write_center(0, line);
            } else {
                self.write_line(row, line, 0);
            }
        }
        self.present();
    }

    fn render_progress(&mut self, title: &str, percent: f64, details: &[(String, String)]) {
        let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
        self.clear();
        self.write_line(0, title, 0);

        let filled = (BAR_LENGTH as f64 * percent / 100.0) as usize;
        let bar = format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_LENGTH - filled));
        self.write_line(1, &bar, 0);
        self.write_line(1, &format!("{:>3.0}%", percent), LCD_COLS - 4);

        for (row, (label, value)) in details.iter().take(LCD_ROWS - 2).enumerate() {
            self.write_line(row + 2, &format!("{}: {}", label, value), 0);
        }
        self.present();
    }
}

/// Emulated controller: interprets the instruction stream into DDRAM and
/// logs each finished frame.
#[derive(Debug, Clone)]
pub struct ConsoleDriver {
    ddram: [u8; 0x80],
    address: usize,
    backlight: bool,
}

impl Default for ConsoleDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleDriver {
    pub fn new() -> Self {
        Self { ddram: [b' '; 0x80], address: 0, backlight: false }
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    /// Visible rows decoded from DDRAM using the 20x4 address layout.
    pub fn rows(&self) -> Vec<String> {
        const ROW_BASE: [usize; LCD_ROWS] = [0x00, 0x40, LCD_COLS, 0x40 + LCD_COLS];
        ROW_BASE
            .iter()
            .map(|base| String::from_utf8_lossy(&self.ddram[*base..*base + LCD_COLS]).into_owned())
            .collect()
    }

    pub fn frame(&self) -> String {
        let border = "=".repeat(LCD_COLS + 2);
        let mut out = border.clone();
        for row in self.rows() {
            out.push_str("\n|");
            out.push_str(&row);
            out.push('|');
        }
        out.push('\n');
        out.push_str(&border);
        out
    }
}

impl DisplayDriver for ConsoleDriver {
    fn write_command(&mut self, cmd: u8) {
        if cmd & CMD_SET_DDRAM != 0 {
            self.address = usize::from(cmd & 0x7f);
        } else if cmd == CMD_CLEAR {
            self.ddram = [b' '; 0x80];
            self.address = 0;
        } else if cmd & 0xfe == CMD_HOME {
            self.address = 0;
        }
    }

    fn write_data(&mut self, byte: u8) {
        self.ddram[self.address] = byte;
        self.address = (self.address + 1) & 0x7f;
    }

    fn backlight_on(&mut self) {
        self.backlight = true;
    }

    fn backlight_off(&mut self) {
        self.backlight = false;
    }

    fn present(&mut self) {
        tracing::info!("\n{}", self.frame());
    }
}
