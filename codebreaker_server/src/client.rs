// Interactive TCP clients for the game and admin channels.
//
// `run_client` pipes the terminal to a game session: a background reader
// thread prints every server line as it arrives while the main thread
// forwards stdin lines to the server. The process ends when either side
// closes.
//
// `run_admin` is single-shot: send one command, print the response, done.

use std::io::{BufRead, BufReader, BufWriter, Read};
use std::net::TcpStream;
use std::thread;

use codebreaker_protocol::framing::{read_trimmed_line, write_line};

/// Connect to a game server and play from the terminal.
pub fn run_client(addr: &str) -> std::io::Result<()> {
    let stream = TcpStream::connect(addr)?;
    let reader_stream = stream.try_clone()?;
    let mut writer = BufWriter::new(stream);

    let printer = thread::spawn(move || {
        let mut reader = BufReader::new(reader_stream);
        while let Ok(Some(line)) = read_trimmed_line(&mut reader) {
            println!("{line}");
        }
        println!("Connection closed by server.");
    });

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if write_line(&mut writer, line.trim()).is_err() {
            break;
        }
    }

    drop(writer);
    let _ = printer.join();
    Ok(())
}

/// Send one command to the admin channel and print the response.
pub fn run_admin(addr: &str, command: &str) -> std::io::Result<()> {
    let stream = TcpStream::connect(addr)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    write_line(&mut writer, command)?;

    let mut response = String::new();
    BufReader::new(stream).read_to_string(&mut response)?;
    print!("{response}");
    Ok(())
}
