pub mod prompt_cursor;
